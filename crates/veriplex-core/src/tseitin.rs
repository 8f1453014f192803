//! Tseitin transformation: propositional formulas to CNF.
//!
//! The input is first pushed into negation normal form, which eliminates
//! `Implies` and `Iff` and leaves negation only on leaves. The post-order
//! walk then introduces a fresh auxiliary for every `And`/`Or` node and
//! emits the standard three-clause definitional equivalence; negated
//! leaves become negative literals without allocating anything. The
//! resulting CNF is equisatisfiable with the input, clause order is
//! deterministic post-order, and the unit clause asserting the root
//! representative comes last.
//!
//! Literals are DIMACS-style signed integers: positive `n` means variable
//! `n` is true, negative means false, numbering starts at 1.

use crate::atom::AtomId;
use crate::formula::Formula;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// A CNF literal (signed, 1-indexed, DIMACS-style).
pub type CnfLit = i32;

/// A CNF clause (disjunction of literals).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnfClause(pub Vec<CnfLit>);

impl CnfClause {
    /// Create a clause from literals.
    pub fn new(literals: Vec<CnfLit>) -> Self {
        CnfClause(literals)
    }

    /// Create a unit clause.
    pub fn unit(lit: CnfLit) -> Self {
        CnfClause(vec![lit])
    }

    /// The literals.
    pub fn literals(&self) -> &[CnfLit] {
        &self.0
    }

    /// True for the empty (conflicting) clause.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a CNF variable stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarOrigin {
    /// A propositional variable from the input formula.
    Prop(String),
    /// An interned theory atom.
    Atom(AtomId),
    /// A fresh auxiliary introduced for a subformula.
    Aux,
}

/// Result of a Tseitin transformation.
#[derive(Debug)]
pub struct TseitinResult {
    /// The CNF clauses, in deterministic post-order; the root assertion is
    /// the final clause.
    pub clauses: Vec<CnfClause>,
    /// What each CNF variable stands for.
    pub origins: BTreeMap<u32, VarOrigin>,
    /// CNF variable for each propositional name.
    pub prop_vars: BTreeMap<String, u32>,
    /// CNF variable for each theory atom.
    pub atom_vars: BTreeMap<AtomId, u32>,
    /// The literal representing the whole formula.
    pub root: CnfLit,
    /// Highest variable index in use.
    pub num_vars: u32,
}

/// Tseitin encoder. The fresh-variable counter is part of this value and
/// threaded through the walk; there is no process-wide state.
#[derive(Debug, Default)]
pub struct Tseitin {
    clauses: Vec<CnfClause>,
    origins: BTreeMap<u32, VarOrigin>,
    prop_vars: BTreeMap<String, u32>,
    atom_vars: BTreeMap<AtomId, u32>,
    memo: FxHashMap<Formula, CnfLit>,
    next_var: u32,
}

impl Tseitin {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Tseitin {
            next_var: 1, // DIMACS variables are 1-indexed
            ..Tseitin::default()
        }
    }

    /// One-shot transformation of a formula.
    pub fn transform(formula: &Formula) -> TseitinResult {
        let mut enc = Tseitin::new();
        let root = enc.encode(formula);
        enc.add_clause(CnfClause::unit(root));
        enc.finish(root)
    }

    /// Allocate a fresh variable with the given origin.
    fn fresh(&mut self, origin: VarOrigin) -> u32 {
        let var = self.next_var;
        self.next_var += 1;
        self.origins.insert(var, origin);
        var
    }

    /// Allocate a fresh auxiliary variable. Used by callers that append
    /// their own clauses on top of the encoding.
    pub fn fresh_aux(&mut self) -> u32 {
        self.fresh(VarOrigin::Aux)
    }

    /// CNF variable for a propositional name, allocating on first use.
    pub fn var_for_prop(&mut self, name: &str) -> u32 {
        if let Some(&var) = self.prop_vars.get(name) {
            return var;
        }
        let var = self.fresh(VarOrigin::Prop(name.to_owned()));
        self.prop_vars.insert(name.to_owned(), var);
        var
    }

    /// CNF variable for a theory atom, allocating on first use.
    pub fn var_for_atom(&mut self, atom: AtomId) -> u32 {
        if let Some(&var) = self.atom_vars.get(&atom) {
            return var;
        }
        let var = self.fresh(VarOrigin::Atom(atom));
        self.atom_vars.insert(atom, var);
        var
    }

    /// Append a clause.
    pub fn add_clause(&mut self, clause: CnfClause) {
        self.clauses.push(clause);
    }

    /// Encode a formula, returning its representative literal. The input
    /// is normalized to negation normal form first, so only `And`/`Or`
    /// nodes allocate auxiliaries, each with the standard three-clause
    /// definitional equivalence emitted in post-order; identical
    /// subformulas share their auxiliary through a memo table.
    pub fn encode(&mut self, formula: &Formula) -> CnfLit {
        self.encode_nnf(&formula.to_nnf())
    }

    fn encode_nnf(&mut self, formula: &Formula) -> CnfLit {
        match formula {
            Formula::True => {
                let var = self.fresh_aux() as CnfLit;
                self.add_clause(CnfClause::unit(var));
                var
            }
            Formula::False => {
                let var = self.fresh_aux() as CnfLit;
                self.add_clause(CnfClause::unit(-var));
                var
            }
            Formula::Var(name) => self.var_for_prop(name) as CnfLit,
            Formula::Atom(id) => self.var_for_atom(*id) as CnfLit,
            // In NNF, negation wraps a leaf; its literal flips sign.
            Formula::Not(p) => -self.encode_nnf(p),
            Formula::And(p, q) => {
                if let Some(&lit) = self.memo.get(formula) {
                    return lit;
                }
                let a = self.encode_nnf(p);
                let b = self.encode_nnf(q);
                let t = self.define_and(a, b);
                self.memo.insert(formula.clone(), t);
                t
            }
            Formula::Or(p, q) => {
                if let Some(&lit) = self.memo.get(formula) {
                    return lit;
                }
                let a = self.encode_nnf(p);
                let b = self.encode_nnf(q);
                let t = self.define_or(a, b);
                self.memo.insert(formula.clone(), t);
                t
            }
            // Eliminated by the normal form; renormalize a raw subtree.
            Formula::Implies(_, _) | Formula::Iff(_, _) => {
                self.encode_nnf(&formula.to_nnf())
            }
        }
    }

    /// Fresh `t` with `t <-> (a and b)`.
    fn define_and(&mut self, a: CnfLit, b: CnfLit) -> CnfLit {
        let t = self.fresh_aux() as CnfLit;
        self.add_clause(CnfClause::new(vec![-t, a]));
        self.add_clause(CnfClause::new(vec![-t, b]));
        self.add_clause(CnfClause::new(vec![t, -a, -b]));
        t
    }

    /// Fresh `t` with `t <-> (a or b)`.
    fn define_or(&mut self, a: CnfLit, b: CnfLit) -> CnfLit {
        let t = self.fresh_aux() as CnfLit;
        self.add_clause(CnfClause::new(vec![-t, a, b]));
        self.add_clause(CnfClause::new(vec![t, -a]));
        self.add_clause(CnfClause::new(vec![t, -b]));
        t
    }

    /// The atom-to-variable mapping built so far.
    pub fn atom_vars(&self) -> &BTreeMap<AtomId, u32> {
        &self.atom_vars
    }

    /// The propositional-name-to-variable mapping built so far.
    pub fn prop_vars(&self) -> &BTreeMap<String, u32> {
        &self.prop_vars
    }

    /// Finish the encoding, consuming the encoder.
    pub fn finish(self, root: CnfLit) -> TseitinResult {
        TseitinResult {
            clauses: self.clauses,
            origins: self.origins,
            prop_vars: self.prop_vars,
            atom_vars: self.atom_vars,
            root,
            num_vars: self.next_var - 1,
        }
    }
}
