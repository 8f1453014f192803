//! Theory solver interface for the DPLL(T) loop.

use crate::atom::AtomId;
use num_rational::BigRational;
use std::collections::BTreeMap;

/// A signed theory literal (atom + boolean value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TheoryLit {
    /// The theory atom.
    pub atom: AtomId,
    /// The boolean value assigned to it.
    pub value: bool,
}

impl TheoryLit {
    /// Create a new signed theory literal.
    #[must_use]
    pub fn new(atom: AtomId, value: bool) -> Self {
        TheoryLit { atom, value }
    }
}

/// Result of a theory check.
#[derive(Debug, Clone)]
pub enum TheoryResult {
    /// The asserted cube is satisfiable.
    Sat,
    /// The asserted cube is unsatisfiable, with a conflicting subset of the
    /// asserted literals. The DPLL(T) layer negates these to produce a
    /// blocking clause.
    Unsat(Vec<TheoryLit>),
    /// The solver gave up (step budget exhausted), with a reason.
    Unknown(String),
}

/// Trait for theory solvers consulted by the DPLL(T) driver.
///
/// A solver instance decides one cube: the driver asserts the theory
/// literals of a full boolean model, calls [`TheorySolver::check`] once,
/// and either reads the model back or learns from the conflict. `reset`
/// clears all asserted state for the next cube.
pub trait TheorySolver {
    /// Assert a signed theory literal.
    fn assert_literal(&mut self, atom: AtomId, value: bool);

    /// Decide the conjunction of everything asserted so far.
    fn check(&mut self) -> TheoryResult;

    /// The real-valued witness of the last successful check.
    fn model(&self) -> BTreeMap<String, BigRational>;

    /// Clear all asserted literals and any model.
    fn reset(&mut self);
}
