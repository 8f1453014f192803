//! Variables and literals of the CNF.
//!
//! A literal is stored as what it means: a variable plus a polarity.
//! This solver has no watched-literal scheme, so there is no
//! literal-indexed array anywhere and nothing to gain from packing the
//! polarity into the variable index. The derived ordering (variable
//! first, then polarity) is what clause canonicalization and the
//! driver's blocking-clause deduplication sort by.

/// A CNF variable, identified by its index into the solver's assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(pub u32);

impl Variable {
    /// Index into assignment-sized arrays.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A literal: a variable together with a polarity. A positive literal is
/// satisfied when its variable is assigned true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    var: Variable,
    positive: bool,
}

impl Literal {
    /// Literal over `var` with the given polarity.
    #[inline]
    pub fn new(var: Variable, positive: bool) -> Self {
        Literal { var, positive }
    }

    /// The underlying variable.
    #[inline]
    pub fn variable(self) -> Variable {
        self.var
    }

    /// Polarity of the literal.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.positive
    }

    /// The opposite literal over the same variable.
    #[inline]
    pub fn negated(self) -> Self {
        Literal {
            var: self.var,
            positive: !self.positive,
        }
    }
}
