//! The simplex Check procedure.
//!
//! Bound-repair simplex in the style of Dutertre & de Moura, "A Fast
//! Linear-Arithmetic Solver for DPLL(T)": find a basic variable outside
//! its bounds, find a non-basic variable whose movement can fix it, pivot,
//! repeat. Bland's rule (smallest variable index) on both selections
//! guarantees termination; a step budget bounds runaway pivoting on top
//! of that.

use crate::bounds::Conflict;
use crate::tableau::{Tableau, VarId};
use num_rational::BigRational;
use num_traits::Signed;
use tracing::trace;

/// Outcome of a Check call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// All rows hold and every variable is within bounds.
    Sat,
    /// Infeasible, with the derivation set of atoms whose bounds witness
    /// the infeasibility.
    Unsat(Conflict),
    /// The step budget ran out before a verdict.
    Budget,
}

impl Tableau {
    /// Run the Check procedure until feasible, infeasible, or out of
    /// budget.
    pub fn check(&mut self) -> CheckOutcome {
        loop {
            if self.budget_exhausted() {
                return CheckOutcome::Budget;
            }

            // Violated basic variable with the smallest index (Bland).
            let mut violated: Option<(VarId, usize, bool, BigRational)> = None;
            for (idx, row) in self.rows().iter().enumerate() {
                let value = self.value(row.basic);
                let bounds = self.bounds(row.basic);
                let candidate = if bounds.lower.as_ref().is_some_and(|l| value < l) {
                    bounds.lower.clone().map(|target| (true, target))
                } else if bounds.upper.as_ref().is_some_and(|u| value > u) {
                    bounds.upper.clone().map(|target| (false, target))
                } else {
                    None
                };
                if let Some((below, target)) = candidate {
                    let smaller = violated
                        .as_ref()
                        .is_none_or(|(best, _, _, _)| row.basic < *best);
                    if smaller {
                        violated = Some((row.basic, idx, below, target));
                    }
                }
            }
            let Some((xi, row_idx, below, target)) = violated else {
                return CheckOutcome::Sat;
            };

            // Entering candidate with the smallest index (Bland again).
            let mut columns: Vec<VarId> = self.rows()[row_idx].coeffs.keys().copied().collect();
            columns.sort_unstable();
            let mut entering = None;
            for xj in columns {
                let coeff = &self.rows()[row_idx].coeffs[&xj];
                let value = self.value(xj);
                let bounds = self.bounds(xj);
                let can_increase = bounds.upper.as_ref().is_none_or(|u| value < u);
                let can_decrease = bounds.lower.as_ref().is_none_or(|l| value > l);
                let suitable = if below {
                    (coeff.is_positive() && can_increase) || (coeff.is_negative() && can_decrease)
                } else {
                    (coeff.is_negative() && can_increase) || (coeff.is_positive() && can_decrease)
                };
                if suitable {
                    entering = Some(xj);
                    break;
                }
            }
            let Some(xj) = entering else {
                return CheckOutcome::Unsat(self.explain(row_idx, below));
            };

            trace!(basic = xi, entering = xj, below, "pivot");

            // Move the entering variable so that xi lands on its violated
            // bound, then swap them structurally.
            let coeff = self.rows()[row_idx].coeffs[&xj].clone();
            let delta = (&target - self.value(xi)) / &coeff;
            let moved = self.value(xj) + &delta;
            self.update_value(xj, moved);
            self.pivot(xj, xi);
            self.set_value_raw(xi, target);
            self.recompute_basics();
        }
    }

    /// Derivation set for an infeasible row: the violated bound of the
    /// stuck basic variable plus, for each non-basic in the row, the bound
    /// that blocked its movement.
    fn explain(&self, row_idx: usize, below: bool) -> Conflict {
        let row = &self.rows()[row_idx];
        let mut atoms = Vec::new();
        let basic_bounds = self.bounds(row.basic);
        atoms.push(if below {
            basic_bounds.lower_origin
        } else {
            basic_bounds.upper_origin
        });
        for (&var, coeff) in &row.coeffs {
            let bounds = self.bounds(var);
            // For the "below" case a positive coefficient was blocked by
            // the upper bound; the other three cases mirror.
            atoms.push(if below == coeff.is_positive() {
                bounds.upper_origin
            } else {
                bounds.lower_origin
            });
        }
        Conflict::new(atoms.into_iter().flatten())
    }
}
