//! Core datatypes for the Veriplex solver: theory atoms with structural
//! interning, the propositional AST and its normal forms, the Tseitin
//! CNF encoding, and the theory-solver interface consumed by DPLL(T).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod atom;
pub mod formula;
pub mod theory;
pub mod tseitin;

pub use atom::{epsilon, Atom, AtomId, AtomStore, LinearAtom, ReluAtom};
pub use formula::Formula;
pub use theory::{TheoryLit, TheoryResult, TheorySolver};
pub use tseitin::{CnfClause, CnfLit, Tseitin, TseitinResult, VarOrigin};
