//! ReLUplex: simplex extended with rectifier constraints.
//!
//! Each rectifier pair `(x, y)` with meaning `y = max(0, x)` is installed
//! as a difference slack `d = y − x` plus the permanent bound `y ≥ 0`.
//! The search loop runs Check, scans the pairs, and repairs the first
//! violated one by moving `y` onto `max(0, α(x))`. When repair cannot fix
//! a pair it is case-split: the *active* branch asserts `x ≥ 0 ∧ d = 0`
//! (hence `y = x`), the *inactive* branch `x ≤ 0 ∧ y = 0`. Splitting is
//! driven by an explicit checkpoint stack, not recursion; a checkpoint
//! snapshots bounds and modes only — rows are created up front, so
//! backtracking never has to remove one.

use crate::bounds::{Conflict, VarBounds};
use crate::simplex::CheckOutcome;
use crate::tableau::{Tableau, VarId};
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use std::collections::BTreeMap;
use tracing::{debug, trace};
use veriplex_core::{AtomId, LinearAtom, ReluAtom};

/// Repair attempts allowed per pair before a case-split is forced. Keeps
/// two pairs from repairing each other's damage forever.
const REPAIR_LIMIT: u32 = 5;

/// A rectifier pair under the constraint `y = max(0, x)`.
#[derive(Debug, Clone, Copy)]
pub struct ReluPair {
    /// Input variable.
    pub x: VarId,
    /// Output variable.
    pub y: VarId,
    /// Difference slack `d = y − x`.
    pub diff: VarId,
    /// The rectifier atom this pair came from.
    pub atom: AtomId,
}

/// Branch state of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReluMode {
    /// No branch committed yet.
    Free,
    /// `y = x`, `x ≥ 0`.
    Active,
    /// `y = 0`, `x ≤ 0`.
    Inactive,
}

/// Saved state for backtracking a case-split.
#[derive(Debug)]
struct Checkpoint {
    bounds: Vec<VarBounds>,
    modes: Vec<ReluMode>,
    pair: usize,
    tried_inactive: bool,
    /// Derivation of the already-failed branch.
    failed_derivation: Vec<AtomId>,
}

/// Search statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReluplexStats {
    /// Case-splits performed.
    pub case_splits: usize,
    /// Repair attempts performed.
    pub repairs: usize,
}

/// Final outcome of a ReLUplex invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReluplexOutcome {
    /// Feasible, with the witnessing assignment of the structural
    /// variables.
    Sat(BTreeMap<String, BigRational>),
    /// Infeasible, with a derivation over the input atoms.
    Unsat(Conflict),
    /// Step budget exhausted.
    Unknown(String),
}

enum RepairResult {
    Fixed,
    Stuck,
    Budget,
}

/// The ReLUplex solver. Built once per theory check from a cube of
/// inequality atoms and rectifier pairs, then discarded.
#[derive(Debug, Default)]
pub struct Reluplex {
    tableau: Tableau,
    pairs: Vec<ReluPair>,
    modes: Vec<ReluMode>,
    repairs: Vec<u32>,
    stack: Vec<Checkpoint>,
    stats: ReluplexStats,
}

impl Reluplex {
    /// Empty solver.
    pub fn new() -> Self {
        Reluplex::default()
    }

    /// Search statistics so far.
    pub fn stats(&self) -> ReluplexStats {
        self.stats
    }

    /// Direct access to the underlying tableau (tests).
    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    /// Assert a linear atom `Σ c·x ≥ b`: a fresh slack takes the linear
    /// combination as its row and `b` as its lower bound.
    pub fn assert_ineq(&mut self, atom: AtomId, ineq: &LinearAtom) -> Result<(), Conflict> {
        let coeffs: Vec<(VarId, BigRational)> = ineq
            .terms()
            .iter()
            .map(|(name, coeff)| (self.tableau.var(name), coeff.clone()))
            .collect();
        let slack = self
            .tableau
            .slack_var(format!("ineq${}", self.tableau.num_vars()));
        self.tableau.add_row(slack, coeffs);
        self.tableau.assert_lower(slack, ineq.bound().clone(), atom)
    }

    /// Assert a rectifier pair: installs the difference slack `d = y − x`
    /// and the permanent bound `y ≥ 0`.
    pub fn assert_relu(&mut self, atom: AtomId, relu: &ReluAtom) -> Result<(), Conflict> {
        let x = self.tableau.var(&relu.x);
        let y = self.tableau.var(&relu.y);
        let diff = self
            .tableau
            .slack_var(format!("relu${}", self.tableau.num_vars()));
        self.tableau.add_row(
            diff,
            vec![
                (y, BigRational::from_integer(1.into())),
                (x, BigRational::from_integer((-1).into())),
            ],
        );
        self.pairs.push(ReluPair { x, y, diff, atom });
        self.modes.push(ReluMode::Free);
        self.repairs.push(0);
        self.tableau.assert_lower(y, BigRational::zero(), atom)
    }

    /// Decide the asserted constraints.
    pub fn solve(&mut self) -> ReluplexOutcome {
        loop {
            match self.tableau.check() {
                CheckOutcome::Budget => {
                    return ReluplexOutcome::Unknown("simplex pivot budget exceeded".into())
                }
                CheckOutcome::Unsat(conflict) => match self.resume_or_fail(conflict) {
                    None => continue,
                    Some(final_conflict) => return ReluplexOutcome::Unsat(final_conflict),
                },
                CheckOutcome::Sat => {}
            }

            if self.tableau.budget_exhausted() {
                return ReluplexOutcome::Unknown("rectifier scan budget exceeded".into());
            }
            self.tableau.note_scan();

            let Some(index) = self.first_violation() else {
                return ReluplexOutcome::Sat(self.tableau.solution());
            };

            if self.modes[index] != ReluMode::Free {
                // A committed branch is enforced by bounds; a violation
                // here means the branch is dead.
                let conflict = Conflict::new([self.pairs[index].atom]);
                match self.resume_or_fail(conflict) {
                    None => continue,
                    Some(final_conflict) => return ReluplexOutcome::Unsat(final_conflict),
                }
            }

            if self.repairs[index] < REPAIR_LIMIT {
                self.repairs[index] += 1;
                match self.try_repair(index) {
                    RepairResult::Fixed => continue,
                    RepairResult::Budget => {
                        return ReluplexOutcome::Unknown("simplex pivot budget exceeded".into())
                    }
                    RepairResult::Stuck => {}
                }
            }

            if let Err(conflict) = self.split(index) {
                match self.resume_or_fail(conflict) {
                    None => continue,
                    Some(final_conflict) => return ReluplexOutcome::Unsat(final_conflict),
                }
            }
        }
    }

    /// First pair (in insertion order) whose constraint is violated by
    /// the current assignment.
    fn first_violation(&self) -> Option<usize> {
        (0..self.pairs.len()).find(|&i| !self.pair_satisfied(i))
    }

    fn pair_satisfied(&self, index: usize) -> bool {
        let pair = &self.pairs[index];
        let vx = self.tableau.value(pair.x);
        let vy = self.tableau.value(pair.y);
        if vx.is_negative() {
            vy.is_zero()
        } else {
            vy == vx
        }
    }

    /// Repair pivot: move `y` onto `max(0, α(x))` and let Check restore
    /// feasibility of the rows.
    fn try_repair(&mut self, index: usize) -> RepairResult {
        let pair = self.pairs[index];
        let vx = self.tableau.value(pair.x);
        let target = if vx.is_negative() {
            BigRational::zero()
        } else {
            vx.clone()
        };
        if !self.tableau.bounds(pair.y).contains(&target) {
            return RepairResult::Stuck;
        }
        if self.tableau.is_basic(pair.y) {
            // Pivot y out of the basis through the smallest column of its
            // row so its value can be set directly.
            let entering = self.tableau.row_of(pair.y).and_then(|row| {
                let mut columns: Vec<VarId> = row.coeffs.keys().copied().collect();
                columns.sort_unstable();
                columns.first().copied()
            });
            let Some(entering) = entering else {
                return RepairResult::Stuck;
            };
            self.tableau.pivot(entering, pair.y);
        }
        self.tableau.update_value(pair.y, target);
        self.stats.repairs += 1;
        trace!(pair = index, "rectifier repair");

        match self.tableau.check() {
            CheckOutcome::Budget => RepairResult::Budget,
            // Bounds were untouched, so a previously feasible system
            // stays feasible; treat anything else as a failed repair.
            CheckOutcome::Unsat(_) => RepairResult::Stuck,
            CheckOutcome::Sat => {
                if self.pair_satisfied(index) {
                    RepairResult::Fixed
                } else {
                    RepairResult::Stuck
                }
            }
        }
    }

    /// Case-split the pair: push a checkpoint and commit to the active
    /// branch first.
    fn split(&mut self, index: usize) -> Result<(), Conflict> {
        self.stats.case_splits += 1;
        debug!(pair = index, "case split");
        self.stack.push(Checkpoint {
            bounds: self.tableau.save_bounds(),
            modes: self.modes.clone(),
            pair: index,
            tried_inactive: false,
            failed_derivation: Vec::new(),
        });
        self.assert_active(index)
    }

    fn assert_active(&mut self, index: usize) -> Result<(), Conflict> {
        let pair = self.pairs[index];
        self.modes[index] = ReluMode::Active;
        self.tableau
            .assert_lower(pair.x, BigRational::zero(), pair.atom)?;
        self.tableau
            .assert_lower(pair.diff, BigRational::zero(), pair.atom)?;
        self.tableau
            .assert_upper(pair.diff, BigRational::zero(), pair.atom)
    }

    fn assert_inactive(&mut self, index: usize) -> Result<(), Conflict> {
        let pair = self.pairs[index];
        self.modes[index] = ReluMode::Inactive;
        self.tableau
            .assert_upper(pair.x, BigRational::zero(), pair.atom)?;
        self.tableau
            .assert_upper(pair.y, BigRational::zero(), pair.atom)
    }

    /// Unwind after a branch failure. Restores the innermost checkpoint
    /// and switches to its inactive branch; when both branches have
    /// failed, merges their derivations and keeps unwinding. Returns the
    /// final derivation once the stack is empty.
    fn resume_or_fail(&mut self, conflict: Conflict) -> Option<Conflict> {
        let mut conflict = conflict;
        loop {
            let Some(mut checkpoint) = self.stack.pop() else {
                return Some(conflict);
            };
            self.tableau.restore_bounds(checkpoint.bounds.clone());
            self.modes.clone_from(&checkpoint.modes);
            if checkpoint.tried_inactive {
                // Both branches failed; the mode bounds carry the
                // rectifier atom as origin, so the merged derivation
                // speaks only of input atoms.
                conflict.merge(checkpoint.failed_derivation);
                continue;
            }
            checkpoint.failed_derivation = conflict.atoms.clone();
            checkpoint.tried_inactive = true;
            let pair = checkpoint.pair;
            debug!(pair, "active branch failed, trying inactive");
            self.stack.push(checkpoint);
            match self.assert_inactive(pair) {
                Ok(()) => return None,
                Err(inner) => conflict = inner,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use num_traits::Signed;

    fn rat(n: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(n))
    }

    fn relu_of(assign: &BTreeMap<String, BigRational>, x: &str) -> BigRational {
        let vx = assign[x].clone();
        if vx.is_negative() {
            BigRational::zero()
        } else {
            vx
        }
    }

    /// x + y >= 5 with y = max(0, x): feasible on the active branch.
    #[test]
    fn active_branch_witness() {
        let mut solver = Reluplex::new();
        solver
            .assert_ineq(AtomId(0), &LinearAtom::from_ints(&[("x", 1), ("y", 1)], 5))
            .unwrap();
        solver
            .assert_relu(
                AtomId(1),
                &ReluAtom {
                    x: "x".into(),
                    y: "y".into(),
                },
            )
            .unwrap();
        match solver.solve() {
            ReluplexOutcome::Sat(assign) => {
                assert!(&assign["x"] + &assign["y"] >= rat(5));
                assert_eq!(assign["y"], relu_of(&assign, "x"));
            }
            other => panic!("expected sat, got {other:?}"),
        }
    }

    /// x >= 0, y = max(0, x), y <= -epsilon: infeasible both ways.
    #[test]
    fn negative_output_is_unsat() {
        let mut solver = Reluplex::new();
        let build = (|| {
            solver.assert_ineq(AtomId(0), &LinearAtom::from_ints(&[("x", 1)], 0))?;
            // y < 0 via the strict-inequality idiom.
            solver.assert_ineq(
                AtomId(1),
                &LinearAtom::new(
                    vec![("y".to_owned(), rat(-1))],
                    veriplex_core::epsilon(),
                ),
            )?;
            solver.assert_relu(
                AtomId(2),
                &ReluAtom {
                    x: "x".into(),
                    y: "y".into(),
                },
            )
        })();
        let outcome = match build {
            Ok(()) => solver.solve(),
            Err(conflict) => ReluplexOutcome::Unsat(conflict),
        };
        match outcome {
            ReluplexOutcome::Unsat(conflict) => {
                assert!(conflict.atoms.contains(&AtomId(2)));
            }
            other => panic!("expected unsat, got {other:?}"),
        }
    }

    /// y >= 1 and x <= 0 with y = max(0, x) is infeasible.
    #[test]
    fn forced_branches_both_fail() {
        let mut solver = Reluplex::new();
        solver
            .assert_ineq(AtomId(0), &LinearAtom::from_ints(&[("y", 1)], 1))
            .unwrap();
        solver
            .assert_ineq(AtomId(1), &LinearAtom::from_ints(&[("x", -1)], 0))
            .unwrap();
        solver
            .assert_relu(
                AtomId(2),
                &ReluAtom {
                    x: "x".into(),
                    y: "y".into(),
                },
            )
            .unwrap();
        match solver.solve() {
            ReluplexOutcome::Unsat(conflict) => {
                assert!(!conflict.atoms.is_empty());
            }
            other => panic!("expected unsat, got {other:?}"),
        }
    }

    /// x = y with y = max(0, x): satisfiable with any x = y >= 0.
    #[test]
    fn identity_pair_is_sat() {
        let mut solver = Reluplex::new();
        solver
            .assert_ineq(AtomId(0), &LinearAtom::from_ints(&[("x", 1), ("y", -1)], 0))
            .unwrap();
        solver
            .assert_ineq(AtomId(1), &LinearAtom::from_ints(&[("x", -1), ("y", 1)], 0))
            .unwrap();
        solver
            .assert_relu(
                AtomId(2),
                &ReluAtom {
                    x: "x".into(),
                    y: "y".into(),
                },
            )
            .unwrap();
        match solver.solve() {
            ReluplexOutcome::Sat(assign) => {
                assert_eq!(assign["x"], assign["y"]);
                assert!(!assign["x"].is_negative());
            }
            other => panic!("expected sat, got {other:?}"),
        }
    }

    /// Chained rectifiers: y = max(0, x), z = max(0, y), x - z >= 0 and
    /// x >= 1 (via -x >= -1 ... actually x - z >= 0 and x >= 1).
    #[test]
    fn chained_pairs_are_sat() {
        let mut solver = Reluplex::new();
        solver
            .assert_ineq(AtomId(0), &LinearAtom::from_ints(&[("x", 1), ("z", -1)], 0))
            .unwrap();
        solver
            .assert_ineq(AtomId(1), &LinearAtom::from_ints(&[("x", 1)], 1))
            .unwrap();
        solver
            .assert_relu(
                AtomId(2),
                &ReluAtom {
                    x: "x".into(),
                    y: "y".into(),
                },
            )
            .unwrap();
        solver
            .assert_relu(
                AtomId(3),
                &ReluAtom {
                    x: "y".into(),
                    y: "z".into(),
                },
            )
            .unwrap();
        match solver.solve() {
            ReluplexOutcome::Sat(assign) => {
                assert_eq!(assign["y"], relu_of(&assign, "x"));
                assert_eq!(assign["z"], relu_of(&assign, "y"));
                assert!(&assign["x"] - &assign["z"] >= rat(0));
                assert!(assign["x"] >= rat(1));
            }
            other => panic!("expected sat, got {other:?}"),
        }
    }

    /// No constraints at all: trivially satisfiable with an empty model.
    #[test]
    fn empty_input_is_sat() {
        let mut solver = Reluplex::new();
        match solver.solve() {
            ReluplexOutcome::Sat(assign) => assert!(assign.is_empty()),
            other => panic!("expected sat, got {other:?}"),
        }
    }
}
