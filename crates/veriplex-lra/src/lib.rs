//! Veriplex LRA - bound-aware simplex with rectifier constraints
//!
//! The theory solver of the Veriplex stack: a revised simplex over exact
//! rationals with per-variable bounds (Dutertre & de Moura style), and a
//! ReLUplex layer on top that enforces `y = max(0, x)` pairs through
//! repair pivots and case-splitting with an explicit checkpoint stack.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bounds;
pub mod reluplex;
pub mod simplex;
pub mod solver;
pub mod tableau;

pub use bounds::{Conflict, VarBounds};
pub use reluplex::{ReluMode, ReluPair, Reluplex, ReluplexOutcome, ReluplexStats};
pub use simplex::CheckOutcome;
pub use solver::ReluplexSolver;
pub use tableau::{Row, Tableau, VarId, PIVOT_BUDGET_FACTOR};
