//! Veriplex DPLL(T) - the lazy SMT driver
//!
//! Ties the stack together: Tseitin-encode the input formula, loop the
//! SAT core for boolean models, hand each model's theory cube to the
//! ReLUplex oracle, and learn a blocking clause from every theory
//! conflict. The CNF only ever grows, and each blocking clause removes at
//! least the current model from the search space, so the loop terminates.

#![warn(missing_docs)]
#![warn(clippy::all)]

use num_rational::BigRational;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use tracing::debug;
use veriplex_core::{
    Atom, AtomId, AtomStore, CnfClause, CnfLit, Formula, TheoryLit, TheoryResult, TheorySolver,
    Tseitin,
};
use veriplex_lra::ReluplexSolver;
use veriplex_sat::{Literal as SatLiteral, SolveResult, Solver as SatSolver, Variable as SatVariable};

/// Tunables for a solver run.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Upper bound on DPLL(T) rounds before giving up with UNKNOWN.
    pub max_rounds: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig { max_rounds: 4096 }
    }
}

/// Fatal errors. Theory conflicts and SAT conflicts are not errors; the
/// only failure that aborts a solve is a broken internal invariant.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SolverError {
    /// An internal invariant was detected broken; this indicates a bug.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Result of a solver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Satisfiable.
    Sat {
        /// Witnessing real assignment of the theory variables.
        assignment: BTreeMap<String, BigRational>,
        /// Boolean value of every theory atom in the accepted model.
        theory_model: BTreeMap<AtomId, bool>,
    },
    /// Unsatisfiable.
    Unsat,
    /// Undecided within the configured budgets.
    Unknown {
        /// Human-readable reason.
        reason: String,
    },
}

/// Counters for one solver run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveStats {
    /// DPLL(T) rounds executed.
    pub rounds: usize,
    /// Blocking clauses learned from theory conflicts.
    pub blocking_clauses: usize,
}

/// The DPLL(T) driver.
pub struct DpllT<'a> {
    store: &'a mut AtomStore,
    config: SolverConfig,
    stats: SolveStats,
}

impl<'a> DpllT<'a> {
    /// Driver over the given atom store with default configuration.
    pub fn new(store: &'a mut AtomStore) -> Self {
        DpllT::with_config(store, SolverConfig::default())
    }

    /// Driver with an explicit configuration.
    pub fn with_config(store: &'a mut AtomStore, config: SolverConfig) -> Self {
        DpllT {
            store,
            config,
            stats: SolveStats::default(),
        }
    }

    /// Counters from the last solve call.
    pub fn stats(&self) -> SolveStats {
        self.stats
    }

    /// Decide the formula.
    pub fn solve(&mut self, formula: &Formula) -> Result<SolveOutcome, SolverError> {
        self.stats = SolveStats::default();

        let simplified = formula.simplify();
        match simplified {
            Formula::True => {
                return Ok(SolveOutcome::Sat {
                    assignment: BTreeMap::new(),
                    theory_model: BTreeMap::new(),
                })
            }
            Formula::False => return Ok(SolveOutcome::Unsat),
            _ => {}
        }

        let mut encoder = Tseitin::new();
        let root = encoder.encode(&simplified);
        encoder.add_clause(CnfClause::unit(root));
        self.expand_rectifier_atoms(&mut encoder);
        let encoding = encoder.finish(root);

        let mut sat = SatSolver::new(encoding.num_vars as usize);
        for clause in &encoding.clauses {
            sat.add_clause(to_sat_literals(clause.literals()));
        }

        let mut seen_blocking: FxHashSet<Vec<SatLiteral>> = FxHashSet::default();

        for round in 0..self.config.max_rounds {
            self.stats.rounds = round + 1;

            let model = match sat.solve() {
                SolveResult::Unsat => return Ok(SolveOutcome::Unsat),
                SolveResult::Sat(model) => model,
            };

            // The theory cube: positive atoms plus negations of negative
            // inequality atoms. Negative rectifier atoms were split into
            // strict inequalities during encoding and carry no cube
            // literal of their own.
            let mut cube: Vec<TheoryLit> = Vec::new();
            let mut theory_model = BTreeMap::new();
            for (&atom, &var) in &encoding.atom_vars {
                let value = model[(var - 1) as usize];
                theory_model.insert(atom, value);
                match self.store.get(atom) {
                    Atom::Relu(_) if !value => {}
                    _ => cube.push(TheoryLit::new(atom, value)),
                }
            }

            if cube.is_empty() {
                return Ok(SolveOutcome::Sat {
                    assignment: BTreeMap::new(),
                    theory_model,
                });
            }

            debug!(round, cube_len = cube.len(), "consulting theory");
            let mut theory = ReluplexSolver::new(self.store);
            for lit in &cube {
                theory.assert_literal(lit.atom, lit.value);
            }
            match theory.check() {
                TheoryResult::Sat => {
                    return Ok(SolveOutcome::Sat {
                        assignment: theory.model(),
                        theory_model,
                    })
                }
                TheoryResult::Unknown(reason) => return Ok(SolveOutcome::Unknown { reason }),
                TheoryResult::Unsat(conflict) => {
                    if conflict.is_empty() {
                        return Ok(SolveOutcome::Unsat);
                    }
                    let clause = self.blocking_clause(&conflict, &encoding.atom_vars)?;
                    // The clause negates literals of the current model, so
                    // the model falsifies it, and it must be new: both are
                    // what guarantees progress.
                    debug_assert!(clause
                        .iter()
                        .all(|lit| model[lit.variable().index()] != lit.is_positive()));
                    if !seen_blocking.insert(clause.clone()) {
                        return Err(SolverError::Internal(
                            "blocking clause learned twice; the loop is not progressing".into(),
                        ));
                    }
                    debug!(round, len = clause.len(), "learned blocking clause");
                    self.stats.blocking_clauses += 1;
                    sat.add_clause(clause);
                }
            }
        }

        Ok(SolveOutcome::Unknown {
            reason: format!("round limit of {} exceeded", self.config.max_rounds),
        })
    }

    /// Negate a theory conflict into a SAT clause.
    fn blocking_clause(
        &self,
        conflict: &[TheoryLit],
        atom_vars: &BTreeMap<AtomId, u32>,
    ) -> Result<Vec<SatLiteral>, SolverError> {
        let mut clause = Vec::with_capacity(conflict.len());
        for lit in conflict {
            let Some(&var) = atom_vars.get(&lit.atom) else {
                return Err(SolverError::Internal(format!(
                    "conflict atom a{} has no CNF variable",
                    lit.atom.0
                )));
            };
            clause.push(SatLiteral::new(SatVariable(var - 1), !lit.value));
        }
        clause.sort();
        clause.dedup();
        Ok(clause)
    }

    /// Tie every rectifier atom's boolean to its theory meaning. A model
    /// that assigns `R(x, y)` false must make `y ≠ max(0, x)` true, which
    /// splits into strict inequalities:
    /// `¬R → (y < 0) ∨ (y < x) ∨ t` with `t ↔ (y > 0 ∧ y > x)`.
    /// The converse direction is three theory lemmas: under `R`, none of
    /// `y < 0`, `y < x`, `y > 0 ∧ y > x` can hold.
    fn expand_rectifier_atoms(&mut self, encoder: &mut Tseitin) {
        let rectifiers: Vec<(AtomId, u32, String, String)> = encoder
            .atom_vars()
            .iter()
            .filter_map(|(&id, &var)| match self.store.get(id) {
                Atom::Relu(relu) => Some((id, var, relu.x.clone(), relu.y.clone())),
                Atom::Ineq(_) => None,
            })
            .collect();

        for (_, relu_var, x, y) in rectifiers {
            let eps = veriplex_core::epsilon();
            let one = BigRational::from_integer(1.into());
            // y < 0, y < x, y > 0, y > x as >=-atoms through the epsilon
            // idiom.
            let y_neg = self
                .store
                .ineq(vec![(y.clone(), -one.clone())], eps.clone());
            let y_lt_x = self.store.ineq(
                vec![(x.clone(), one.clone()), (y.clone(), -one.clone())],
                eps.clone(),
            );
            let y_pos = self.store.ineq(vec![(y.clone(), one.clone())], eps.clone());
            let y_gt_x = self
                .store
                .ineq(vec![(y.clone(), one.clone()), (x.clone(), -one.clone())], eps);

            let r = relu_var as CnfLit;
            let v_neg = encoder.var_for_atom(y_neg) as CnfLit;
            let v_lt_x = encoder.var_for_atom(y_lt_x) as CnfLit;
            let v_pos = encoder.var_for_atom(y_pos) as CnfLit;
            let v_gt_x = encoder.var_for_atom(y_gt_x) as CnfLit;
            let t = encoder.fresh_aux() as CnfLit;

            // ~R implies some violation.
            encoder.add_clause(CnfClause::new(vec![r, v_neg, v_lt_x, t]));
            // t <-> (y > 0 and y > x).
            encoder.add_clause(CnfClause::new(vec![-t, v_pos]));
            encoder.add_clause(CnfClause::new(vec![-t, v_gt_x]));
            encoder.add_clause(CnfClause::new(vec![t, -v_pos, -v_gt_x]));
            // R excludes each violation.
            encoder.add_clause(CnfClause::new(vec![-r, -v_neg]));
            encoder.add_clause(CnfClause::new(vec![-r, -v_lt_x]));
            encoder.add_clause(CnfClause::new(vec![-r, -t]));
        }
    }
}

/// Convert 1-indexed DIMACS literals to 0-indexed SAT literals.
fn to_sat_literals(literals: &[CnfLit]) -> Vec<SatLiteral> {
    literals
        .iter()
        .map(|&lit| {
            let var = SatVariable((lit.unsigned_abs() - 1) as u32);
            SatLiteral::new(var, lit > 0)
        })
        .collect()
}
