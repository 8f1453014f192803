//! Propositional AST over theory atoms.
//!
//! Formulas are plain trees dispatched by pattern match. Leaves are either
//! propositional names or interned theory atoms treated as opaque boolean
//! identifiers. Normal forms: constant folding ([`Formula::simplify`]) and
//! negation normal form ([`Formula::to_nnf`]).

use crate::atom::AtomId;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A propositional formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    /// The constant ⊤.
    True,
    /// The constant ⊥.
    False,
    /// A propositional variable.
    Var(String),
    /// An interned theory atom used as an opaque boolean.
    Atom(AtomId),
    /// Negation.
    Not(Box<Formula>),
    /// Conjunction.
    And(Box<Formula>, Box<Formula>),
    /// Disjunction.
    Or(Box<Formula>, Box<Formula>),
    /// Implication.
    Implies(Box<Formula>, Box<Formula>),
    /// Equivalence.
    Iff(Box<Formula>, Box<Formula>),
}

impl Formula {
    /// Propositional variable by name.
    pub fn var(name: impl Into<String>) -> Formula {
        Formula::Var(name.into())
    }

    /// Negation.
    pub fn not(f: Formula) -> Formula {
        Formula::Not(Box::new(f))
    }

    /// Conjunction.
    pub fn and(a: Formula, b: Formula) -> Formula {
        Formula::And(Box::new(a), Box::new(b))
    }

    /// Disjunction.
    pub fn or(a: Formula, b: Formula) -> Formula {
        Formula::Or(Box::new(a), Box::new(b))
    }

    /// Implication.
    pub fn implies(a: Formula, b: Formula) -> Formula {
        Formula::Implies(Box::new(a), Box::new(b))
    }

    /// Equivalence.
    pub fn iff(a: Formula, b: Formula) -> Formula {
        Formula::Iff(Box::new(a), Box::new(b))
    }

    /// Conjunction of a sequence, `⊤` when empty.
    pub fn conj(fs: impl IntoIterator<Item = Formula>) -> Formula {
        let mut iter = fs.into_iter();
        match iter.next() {
            None => Formula::True,
            Some(first) => iter.fold(first, Formula::and),
        }
    }

    /// True for `Var`, `Atom`, and the constants.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Formula::True | Formula::False | Formula::Var(_) | Formula::Atom(_)
        )
    }

    /// Constant folding: evaluates away `True`/`False` subterms and double
    /// negation. Leaves the connective structure otherwise untouched.
    pub fn simplify(&self) -> Formula {
        match self {
            Formula::True | Formula::False | Formula::Var(_) | Formula::Atom(_) => self.clone(),
            Formula::Not(p) => match p.simplify() {
                Formula::True => Formula::False,
                Formula::False => Formula::True,
                Formula::Not(inner) => *inner,
                other => Formula::not(other),
            },
            Formula::And(p, q) => match (p.simplify(), q.simplify()) {
                (Formula::False, _) | (_, Formula::False) => Formula::False,
                (Formula::True, other) | (other, Formula::True) => other,
                (a, b) => Formula::and(a, b),
            },
            Formula::Or(p, q) => match (p.simplify(), q.simplify()) {
                (Formula::True, _) | (_, Formula::True) => Formula::True,
                (Formula::False, other) | (other, Formula::False) => other,
                (a, b) => Formula::or(a, b),
            },
            Formula::Implies(p, q) => match (p.simplify(), q.simplify()) {
                (Formula::False, _) | (_, Formula::True) => Formula::True,
                (Formula::True, other) => other,
                (other, Formula::False) => Formula::not(other),
                (a, b) => Formula::implies(a, b),
            },
            Formula::Iff(p, q) => match (p.simplify(), q.simplify()) {
                (Formula::True, other) | (other, Formula::True) => other,
                (Formula::False, other) | (other, Formula::False) => {
                    Formula::not(other).simplify()
                }
                (a, b) => Formula::iff(a, b),
            },
        }
    }

    /// Negation normal form: `Implies`/`Iff` eliminated, negation pushed
    /// down to the leaves.
    pub fn to_nnf(&self) -> Formula {
        fn nnf(f: &Formula, negate: bool) -> Formula {
            match (f, negate) {
                (Formula::True, false) | (Formula::False, true) => Formula::True,
                (Formula::True, true) | (Formula::False, false) => Formula::False,
                (Formula::Var(_) | Formula::Atom(_), false) => f.clone(),
                (Formula::Var(_) | Formula::Atom(_), true) => Formula::not(f.clone()),
                (Formula::Not(p), _) => nnf(p, !negate),
                (Formula::And(p, q), false) => Formula::and(nnf(p, false), nnf(q, false)),
                (Formula::And(p, q), true) => Formula::or(nnf(p, true), nnf(q, true)),
                (Formula::Or(p, q), false) => Formula::or(nnf(p, false), nnf(q, false)),
                (Formula::Or(p, q), true) => Formula::and(nnf(p, true), nnf(q, true)),
                (Formula::Implies(p, q), false) => Formula::or(nnf(p, true), nnf(q, false)),
                (Formula::Implies(p, q), true) => Formula::and(nnf(p, false), nnf(q, true)),
                (Formula::Iff(p, q), false) => Formula::and(
                    Formula::or(nnf(p, true), nnf(q, false)),
                    Formula::or(nnf(p, false), nnf(q, true)),
                ),
                (Formula::Iff(p, q), true) => Formula::or(
                    Formula::and(nnf(p, false), nnf(q, true)),
                    Formula::and(nnf(p, true), nnf(q, false)),
                ),
            }
        }
        nnf(&self.simplify(), false)
    }

    /// Evaluate under boolean environments for variables and atoms.
    /// Unassigned leaves default to `false`.
    pub fn eval(&self, vars: &BTreeMap<String, bool>, atoms: &BTreeMap<AtomId, bool>) -> bool {
        match self {
            Formula::True => true,
            Formula::False => false,
            Formula::Var(name) => vars.get(name).copied().unwrap_or(false),
            Formula::Atom(id) => atoms.get(id).copied().unwrap_or(false),
            Formula::Not(p) => !p.eval(vars, atoms),
            Formula::And(p, q) => p.eval(vars, atoms) && q.eval(vars, atoms),
            Formula::Or(p, q) => p.eval(vars, atoms) || q.eval(vars, atoms),
            Formula::Implies(p, q) => !p.eval(vars, atoms) || q.eval(vars, atoms),
            Formula::Iff(p, q) => p.eval(vars, atoms) == q.eval(vars, atoms),
        }
    }

    /// Collect the propositional variables and theory atoms occurring in
    /// the formula.
    pub fn leaves(&self, vars: &mut BTreeSet<String>, atoms: &mut BTreeSet<AtomId>) {
        match self {
            Formula::True | Formula::False => {}
            Formula::Var(name) => {
                vars.insert(name.clone());
            }
            Formula::Atom(id) => {
                atoms.insert(*id);
            }
            Formula::Not(p) => p.leaves(vars, atoms),
            Formula::And(p, q)
            | Formula::Or(p, q)
            | Formula::Implies(p, q)
            | Formula::Iff(p, q) => {
                p.leaves(vars, atoms);
                q.leaves(vars, atoms);
            }
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::True => write!(f, "true"),
            Formula::False => write!(f, "false"),
            Formula::Var(name) => write!(f, "{name}"),
            Formula::Atom(id) => write!(f, "a{}", id.0),
            Formula::Not(p) => write!(f, "~{p}"),
            Formula::And(p, q) => write!(f, "({p} and {q})"),
            Formula::Or(p, q) => write!(f, "({p} or {q})"),
            Formula::Implies(p, q) => write!(f, "({p} -> {q})"),
            Formula::Iff(p, q) => write!(f, "({p} <-> {q})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> Formula {
        Formula::var("p")
    }

    fn q() -> Formula {
        Formula::var("q")
    }

    #[test]
    fn simplify_folds_constants() {
        let f = Formula::and(Formula::True, Formula::or(p(), Formula::False));
        assert_eq!(f.simplify(), p());

        let g = Formula::implies(Formula::False, p());
        assert_eq!(g.simplify(), Formula::True);

        let h = Formula::not(Formula::not(p()));
        assert_eq!(h.simplify(), p());
    }

    #[test]
    fn nnf_pushes_negation_to_leaves() {
        // ~(p and q)  =>  ~p or ~q
        let f = Formula::not(Formula::and(p(), q()));
        assert_eq!(f.to_nnf(), Formula::or(Formula::not(p()), Formula::not(q())));
    }

    #[test]
    fn nnf_eliminates_implies_and_iff() {
        let f = Formula::implies(p(), q());
        assert_eq!(f.to_nnf(), Formula::or(Formula::not(p()), q()));

        let g = Formula::iff(p(), q()).to_nnf();
        fn contains_impl(f: &Formula) -> bool {
            match f {
                Formula::Implies(_, _) | Formula::Iff(_, _) => true,
                Formula::Not(p) => contains_impl(p),
                Formula::And(p, q) | Formula::Or(p, q) => contains_impl(p) || contains_impl(q),
                _ => false,
            }
        }
        assert!(!contains_impl(&g));
    }

    #[test]
    fn nnf_preserves_truth() {
        let cases = [
            Formula::not(Formula::and(p(), q())),
            Formula::iff(p(), Formula::not(q())),
            Formula::implies(Formula::or(p(), q()), Formula::and(p(), q())),
            Formula::not(Formula::iff(p(), q())),
        ];
        for f in &cases {
            let g = f.to_nnf();
            for bits in 0..4u32 {
                let vars: BTreeMap<String, bool> = [
                    ("p".to_owned(), bits & 1 != 0),
                    ("q".to_owned(), bits & 2 != 0),
                ]
                .into_iter()
                .collect();
                let atoms = BTreeMap::new();
                assert_eq!(f.eval(&vars, &atoms), g.eval(&vars, &atoms), "{f}");
            }
        }
    }
}
