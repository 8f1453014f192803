//! The theory oracle consulted by DPLL(T).
//!
//! Collects the signed theory literals of one boolean model, builds a
//! fresh [`Reluplex`] from them, and maps its verdict back onto the
//! asserted literals. Negated inequalities are asserted in their
//! ε-weakened contrapositive form; negated rectifier atoms never reach
//! this layer (the driver splits them during CNF encoding).

use crate::bounds::Conflict;
use crate::reluplex::{Reluplex, ReluplexOutcome};
use num_rational::BigRational;
use std::collections::BTreeMap;
use tracing::debug;
use veriplex_core::{Atom, AtomStore, TheoryLit, TheoryResult, TheorySolver};

/// ReLUplex-backed implementation of the [`TheorySolver`] interface.
pub struct ReluplexSolver<'a> {
    store: &'a AtomStore,
    asserted: Vec<TheoryLit>,
    model: BTreeMap<String, BigRational>,
}

impl<'a> ReluplexSolver<'a> {
    /// New solver over the given atom store.
    pub fn new(store: &'a AtomStore) -> Self {
        ReluplexSolver {
            store,
            asserted: Vec::new(),
            model: BTreeMap::new(),
        }
    }

    /// Map a derivation over atoms back to the asserted signed literals.
    fn conflict_lits(&self, conflict: &Conflict) -> Vec<TheoryLit> {
        conflict
            .atoms
            .iter()
            .filter_map(|&atom| self.asserted.iter().find(|lit| lit.atom == atom).copied())
            .collect()
    }
}

impl TheorySolver for ReluplexSolver<'_> {
    fn assert_literal(&mut self, atom: veriplex_core::AtomId, value: bool) {
        self.asserted.push(TheoryLit::new(atom, value));
    }

    fn check(&mut self) -> TheoryResult {
        let mut engine = Reluplex::new();
        for lit in &self.asserted {
            let asserted = match self.store.get(lit.atom) {
                Atom::Ineq(ineq) => {
                    if lit.value {
                        engine.assert_ineq(lit.atom, ineq)
                    } else {
                        engine.assert_ineq(lit.atom, &ineq.negated())
                    }
                }
                Atom::Relu(relu) => {
                    if lit.value {
                        engine.assert_relu(lit.atom, relu)
                    } else {
                        // Split into strict inequalities by the driver's
                        // CNF expansion; nothing to assert here.
                        Ok(())
                    }
                }
            };
            if let Err(conflict) = asserted {
                debug!(?conflict, "conflict while asserting cube");
                return TheoryResult::Unsat(self.conflict_lits(&conflict));
            }
        }

        match engine.solve() {
            ReluplexOutcome::Sat(model) => {
                self.model = model;
                TheoryResult::Sat
            }
            ReluplexOutcome::Unsat(conflict) => {
                debug!(?conflict, "theory conflict");
                TheoryResult::Unsat(self.conflict_lits(&conflict))
            }
            ReluplexOutcome::Unknown(reason) => TheoryResult::Unknown(reason),
        }
    }

    fn model(&self) -> BTreeMap<String, BigRational> {
        self.model.clone()
    }

    fn reset(&mut self) {
        self.asserted.clear();
        self.model.clear();
    }
}
