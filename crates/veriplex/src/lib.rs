//! Veriplex - a DPLL(T) decision procedure for linear real arithmetic
//! with rectifier constraints
//!
//! Decides quantifier-free formulas over propositional logic, linear
//! inequalities `Σ c·x ≥ b`, and rectifier relations `y = max(0, x)` —
//! the combination that encodes small rectifier-network verification
//! queries. Satisfiable formulas come back with an exact rational witness
//! and the boolean values of all theory atoms.
//!
//! ```
//! use veriplex::{solve_str, SolveOutcome};
//!
//! let outcome = solve_str("ineq(1,x,1,y,5) and relu(x,y)").unwrap();
//! assert!(matches!(outcome, SolveOutcome::Sat { .. }));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use veriplex_core::{
    epsilon, Atom, AtomId, AtomStore, Formula, LinearAtom, ReluAtom, TheoryLit, TheoryResult,
    TheorySolver, Tseitin, TseitinResult,
};
pub use veriplex_dpll::{DpllT, SolveOutcome, SolveStats, SolverConfig, SolverError};
pub use veriplex_frontend::{parse, ParseError};
pub use veriplex_lra::{CheckOutcome, Reluplex, ReluplexOutcome, ReluplexSolver, Tableau};

/// Any failure a top-level call can produce.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The input text could not be read.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The solver hit a broken internal invariant.
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Decide an already-constructed formula against the given atom store.
pub fn solve(formula: &Formula, store: &mut AtomStore) -> Result<SolveOutcome, SolverError> {
    DpllT::new(store).solve(formula)
}

/// Parse and decide a formula in the surface syntax.
pub fn solve_str(input: &str) -> Result<SolveOutcome, Error> {
    let mut store = AtomStore::new();
    let formula = parse(input, &mut store)?;
    Ok(DpllT::new(&mut store).solve(&formula)?)
}
