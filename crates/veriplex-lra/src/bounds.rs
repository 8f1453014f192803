//! Per-variable bounds with atom origins.

use num_rational::BigRational;
use veriplex_core::AtomId;

/// Lower/upper bounds of one variable. `None` means unbounded on that
/// side. Each finite bound remembers the atom that asserted it so that
/// infeasibility explanations can name input atoms.
#[derive(Debug, Clone, Default)]
pub struct VarBounds {
    /// Lower bound, `None` = −∞.
    pub lower: Option<BigRational>,
    /// Upper bound, `None` = +∞.
    pub upper: Option<BigRational>,
    /// Atom that asserted the current lower bound.
    pub lower_origin: Option<AtomId>,
    /// Atom that asserted the current upper bound.
    pub upper_origin: Option<AtomId>,
}

impl VarBounds {
    /// Unbounded in both directions.
    pub fn unbounded() -> Self {
        VarBounds::default()
    }

    /// True if `value` lies within the bounds.
    pub fn contains(&self, value: &BigRational) -> bool {
        self.lower.as_ref().is_none_or(|l| value >= l)
            && self.upper.as_ref().is_none_or(|u| value <= u)
    }

    /// True if the interval is empty (`lower > upper`).
    pub fn is_empty_interval(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(l), Some(u)) => l > u,
            _ => false,
        }
    }
}

/// A set of input atoms that cannot hold simultaneously. Kept sorted and
/// deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The conflicting atoms.
    pub atoms: Vec<AtomId>,
}

impl Conflict {
    /// Build a conflict from the given atoms.
    pub fn new(atoms: impl IntoIterator<Item = AtomId>) -> Self {
        let mut atoms: Vec<AtomId> = atoms.into_iter().collect();
        atoms.sort();
        atoms.dedup();
        Conflict { atoms }
    }

    /// Union with another derivation.
    pub fn merge(&mut self, other: impl IntoIterator<Item = AtomId>) {
        self.atoms.extend(other);
        self.atoms.sort();
        self.atoms.dedup();
    }
}
