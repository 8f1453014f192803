//! The simplex tableau: rows, bounds, and the current assignment.
//!
//! The tableau partitions its variables into basic and non-basic. Every
//! basic variable owns one row `x_i = Σ a_ij · x_j` over non-basic
//! variables. Invariants:
//!
//! - every row holds exactly under the current assignment;
//! - every non-basic variable lies within its bounds;
//! - basic variables may be out of bounds (that is the repair target);
//! - `lower ≤ upper` for every variable, or the tableau conflicts.
//!
//! Arithmetic is exact (`BigRational`); comparisons never need a
//! tolerance.

use crate::bounds::{Conflict, VarBounds};
use num_rational::BigRational;
use num_traits::Zero;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use veriplex_core::AtomId;

/// Index of a tableau variable.
pub type VarId = usize;

/// Pivot budget constant: a tableau may spend at most
/// `PIVOT_BUDGET_FACTOR · |V|²` steps (pivots plus rectifier pair scans)
/// before the check gives up with a budget outcome.
pub const PIVOT_BUDGET_FACTOR: usize = 64;

/// One tableau row: `basic = Σ coeffs[v] · v` over non-basic variables.
/// Zero coefficients are never stored.
#[derive(Debug, Clone)]
pub struct Row {
    /// The basic variable owning this row.
    pub basic: VarId,
    /// Non-basic coefficients.
    pub coeffs: FxHashMap<VarId, BigRational>,
}

/// Simplex state: rows, bounds, and the current assignment.
#[derive(Debug, Default)]
pub struct Tableau {
    names: Vec<String>,
    ids: FxHashMap<String, VarId>,
    slack: Vec<bool>,
    rows: Vec<Row>,
    /// Row index of each basic variable, `None` for non-basic.
    basic_row: Vec<Option<usize>>,
    bounds: Vec<VarBounds>,
    values: Vec<BigRational>,
    steps: usize,
}

impl Tableau {
    /// Empty tableau.
    pub fn new() -> Self {
        Tableau::default()
    }

    /// Intern a structural (user-visible) variable.
    pub fn var(&mut self, name: &str) -> VarId {
        self.var_inner(name, false)
    }

    /// Intern a slack variable. Slacks are hidden from extracted models.
    pub fn slack_var(&mut self, name: String) -> VarId {
        self.var_inner(&name, true)
    }

    fn var_inner(&mut self, name: &str, slack: bool) -> VarId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        self.slack.push(slack);
        self.basic_row.push(None);
        self.bounds.push(VarBounds::unbounded());
        self.values.push(BigRational::zero());
        id
    }

    /// Number of variables (basic and non-basic).
    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    /// Current value of a variable.
    pub fn value(&self, var: VarId) -> &BigRational {
        &self.values[var]
    }

    /// Bounds of a variable.
    pub fn bounds(&self, var: VarId) -> &VarBounds {
        &self.bounds[var]
    }

    /// True if the variable currently owns a row.
    pub fn is_basic(&self, var: VarId) -> bool {
        self.basic_row[var].is_some()
    }

    pub(crate) fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub(crate) fn row_of(&self, var: VarId) -> Option<&Row> {
        self.basic_row[var].map(|idx| &self.rows[idx])
    }

    /// Install `basic = Σ coeffs · vars` as a new row. The basic variable
    /// must be fresh (not yet basic, not referenced by other rows); its
    /// value is computed from the row.
    pub fn add_row(&mut self, basic: VarId, coeffs: Vec<(VarId, BigRational)>) {
        let mut merged: FxHashMap<VarId, BigRational> = FxHashMap::default();
        for (var, coeff) in coeffs {
            let entry = merged.entry(var).or_insert_with(BigRational::zero);
            *entry += coeff;
        }
        merged.retain(|_, coeff| !coeff.is_zero());
        let value = merged
            .iter()
            .map(|(&var, coeff)| coeff * &self.values[var])
            .sum();
        self.values[basic] = value;
        self.basic_row[basic] = Some(self.rows.len());
        self.rows.push(Row {
            basic,
            coeffs: merged,
        });
    }

    /// Tighten the lower bound of a variable. Re-clamps a non-basic
    /// variable into the new bound (propagating the delta through the
    /// rows); an empty interval is an immediate conflict naming both
    /// bound origins.
    pub fn assert_lower(
        &mut self,
        var: VarId,
        bound: BigRational,
        origin: AtomId,
    ) -> Result<(), Conflict> {
        if self.bounds[var]
            .lower
            .as_ref()
            .is_some_and(|l| *l >= bound)
        {
            return Ok(());
        }
        self.bounds[var].lower = Some(bound.clone());
        self.bounds[var].lower_origin = Some(origin);
        if self.bounds[var].is_empty_interval() {
            return Err(Conflict::new(
                [Some(origin), self.bounds[var].upper_origin]
                    .into_iter()
                    .flatten(),
            ));
        }
        if !self.is_basic(var) && self.values[var] < bound {
            self.update_value(var, bound);
        }
        Ok(())
    }

    /// Tighten the upper bound of a variable; mirror of `assert_lower`.
    pub fn assert_upper(
        &mut self,
        var: VarId,
        bound: BigRational,
        origin: AtomId,
    ) -> Result<(), Conflict> {
        if self.bounds[var]
            .upper
            .as_ref()
            .is_some_and(|u| *u <= bound)
        {
            return Ok(());
        }
        self.bounds[var].upper = Some(bound.clone());
        self.bounds[var].upper_origin = Some(origin);
        if self.bounds[var].is_empty_interval() {
            return Err(Conflict::new(
                [self.bounds[var].lower_origin, Some(origin)]
                    .into_iter()
                    .flatten(),
            ));
        }
        if !self.is_basic(var) && self.values[var] > bound {
            self.update_value(var, bound);
        }
        Ok(())
    }

    /// Set a non-basic variable's value and recompute every basic value
    /// from the rows.
    pub fn update_value(&mut self, var: VarId, value: BigRational) {
        self.values[var] = value;
        self.recompute_basics();
    }

    /// Recompute all basic values from the rows.
    pub fn recompute_basics(&mut self) {
        for idx in 0..self.rows.len() {
            let value: BigRational = self.rows[idx]
                .coeffs
                .iter()
                .map(|(&var, coeff)| coeff * &self.values[var])
                .sum();
            self.values[self.rows[idx].basic] = value;
        }
    }

    /// Structural pivot: the non-basic `entering` takes over the row of
    /// the basic `leaving`, and every other row substitutes the entering
    /// variable away. Values are not touched; callers re-establish them.
    pub fn pivot(&mut self, entering: VarId, leaving: VarId) {
        let Some(row_idx) = self.basic_row[leaving] else {
            return;
        };
        let Some(a) = self.rows[row_idx].coeffs.get(&entering).cloned() else {
            return;
        };
        debug_assert!(!a.is_zero());

        // Rewrite the pivot row as entering = ...
        let old_coeffs = std::mem::take(&mut self.rows[row_idx].coeffs);
        let mut new_coeffs: FxHashMap<VarId, BigRational> = FxHashMap::default();
        for (var, coeff) in old_coeffs {
            if var != entering {
                new_coeffs.insert(var, -coeff / &a);
            }
        }
        new_coeffs.insert(leaving, a.recip());
        self.rows[row_idx].basic = entering;
        self.rows[row_idx].coeffs = new_coeffs.clone();
        self.basic_row[leaving] = None;
        self.basic_row[entering] = Some(row_idx);

        // Substitute the entering variable in every other row.
        for idx in 0..self.rows.len() {
            if idx == row_idx {
                continue;
            }
            let Some(factor) = self.rows[idx].coeffs.remove(&entering) else {
                continue;
            };
            for (var, coeff) in &new_coeffs {
                let entry = self.rows[idx]
                    .coeffs
                    .entry(*var)
                    .or_insert_with(BigRational::zero);
                *entry += &factor * coeff;
            }
            self.rows[idx].coeffs.retain(|_, coeff| !coeff.is_zero());
        }
        self.steps += 1;
    }

    pub(crate) fn set_value_raw(&mut self, var: VarId, value: BigRational) {
        self.values[var] = value;
    }

    /// Count a rectifier pair scan against the step budget.
    pub fn note_scan(&mut self) {
        self.steps += 1;
    }

    /// Steps spent so far (pivots plus pair scans).
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// True once the `PIVOT_BUDGET_FACTOR · |V|²` step budget is spent.
    pub fn budget_exhausted(&self) -> bool {
        let n = self.num_vars().max(1);
        self.steps >= PIVOT_BUDGET_FACTOR * n * n
    }

    /// Snapshot of all bounds (for checkpointing).
    pub fn save_bounds(&self) -> Vec<VarBounds> {
        self.bounds.clone()
    }

    /// Restore a bounds snapshot taken by `save_bounds`.
    pub fn restore_bounds(&mut self, bounds: Vec<VarBounds>) {
        debug_assert_eq!(bounds.len(), self.bounds.len());
        self.bounds = bounds;
    }

    /// The current assignment of the structural (non-slack) variables.
    pub fn solution(&self) -> BTreeMap<String, BigRational> {
        self.names
            .iter()
            .enumerate()
            .filter(|&(var, _)| !self.slack[var])
            .map(|(var, name)| (name.clone(), self.values[var].clone()))
            .collect()
    }
}
