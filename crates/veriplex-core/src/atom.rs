//! Theory atoms and structural interning.
//!
//! The theory vocabulary has exactly two atom kinds: linear inequalities
//! `Σ cᵢ·xᵢ ≥ b` over real variables, and rectifier constraints
//! `y = max(0, x)`. Atoms are value types interned by an [`AtomStore`] so
//! that SAT literals and theory literals correspond one-to-one.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;

/// The strict-inequality tolerance, `10⁻⁹`, as an exact rational.
///
/// Strict comparisons are weakened through it: `y < 0` is written
/// `−y ≥ ε`, and the negation of `Σ c·x ≥ b` is `Σ −c·x ≥ −b + ε`.
pub fn epsilon() -> BigRational {
    BigRational::new(BigInt::one(), BigInt::from(1_000_000_000))
}

/// A linear inequality `Σ cᵢ·xᵢ ≥ bound`.
///
/// The term list is canonical: sorted by variable name, duplicates merged,
/// zero coefficients dropped. Structural equality on the canonical form is
/// what the interner uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinearAtom {
    terms: Vec<(String, BigRational)>,
    bound: BigRational,
}

impl LinearAtom {
    /// Build an inequality, canonicalizing the term list.
    pub fn new(terms: Vec<(String, BigRational)>, bound: BigRational) -> Self {
        let mut merged: BTreeMap<String, BigRational> = BTreeMap::new();
        for (var, coeff) in terms {
            *merged.entry(var).or_insert_with(BigRational::zero) += coeff;
        }
        let terms = merged
            .into_iter()
            .filter(|(_, coeff)| !coeff.is_zero())
            .collect();
        LinearAtom { terms, bound }
    }

    /// Convenience constructor from integer coefficients.
    pub fn from_ints(terms: &[(&str, i64)], bound: i64) -> Self {
        LinearAtom::new(
            terms
                .iter()
                .map(|&(var, c)| (var.to_owned(), BigRational::from_integer(BigInt::from(c))))
                .collect(),
            BigRational::from_integer(BigInt::from(bound)),
        )
    }

    /// The canonical term list.
    pub fn terms(&self) -> &[(String, BigRational)] {
        &self.terms
    }

    /// The right-hand side.
    pub fn bound(&self) -> &BigRational {
        &self.bound
    }

    /// The ε-weakened negation: `¬(Σ c·x ≥ b)` as `Σ −c·x ≥ −b + ε`.
    pub fn negated(&self) -> LinearAtom {
        LinearAtom {
            terms: self
                .terms
                .iter()
                .map(|(var, coeff)| (var.clone(), -coeff))
                .collect(),
            bound: -&self.bound + epsilon(),
        }
    }
}

impl fmt::Display for LinearAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            write!(f, "0 >= {}", self.bound)
        } else {
            for (i, (var, coeff)) in self.terms.iter().enumerate() {
                if i > 0 {
                    write!(f, " + ")?;
                }
                write!(f, "{coeff}*{var}")?;
            }
            write!(f, " >= {}", self.bound)
        }
    }
}

/// A rectifier constraint `y = max(0, x)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReluAtom {
    /// Input variable.
    pub x: String,
    /// Output variable.
    pub y: String,
}

impl fmt::Display for ReluAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = max(0, {})", self.y, self.x)
    }
}

/// A theory atom: the indivisible formulas the theory solver understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Atom {
    /// Linear inequality `Σ cᵢ·xᵢ ≥ b`.
    Ineq(LinearAtom),
    /// Rectifier relation `y = max(0, x)`.
    Relu(ReluAtom),
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Ineq(a) => a.fmt(f),
            Atom::Relu(r) => r.fmt(f),
        }
    }
}

/// Interned atom identity, shared between the SAT encoding and the theory
/// solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomId(pub u32);

impl AtomId {
    /// Index into the store's backing vector.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interning table for theory atoms.
///
/// Structural equality on canonicalized atoms; interning the same atom
/// twice returns the same [`AtomId`].
#[derive(Debug, Default)]
pub struct AtomStore {
    atoms: Vec<Atom>,
    ids: FxHashMap<Atom, AtomId>,
}

impl AtomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        AtomStore::default()
    }

    /// Intern an atom, returning its identity.
    pub fn intern(&mut self, atom: Atom) -> AtomId {
        if let Some(&id) = self.ids.get(&atom) {
            return id;
        }
        let id = AtomId(self.atoms.len() as u32);
        self.atoms.push(atom.clone());
        self.ids.insert(atom, id);
        id
    }

    /// Intern a linear inequality.
    pub fn ineq(&mut self, terms: Vec<(String, BigRational)>, bound: BigRational) -> AtomId {
        self.intern(Atom::Ineq(LinearAtom::new(terms, bound)))
    }

    /// Intern a rectifier atom.
    pub fn relu(&mut self, x: impl Into<String>, y: impl Into<String>) -> AtomId {
        self.intern(Atom::Relu(ReluAtom {
            x: x.into(),
            y: y.into(),
        }))
    }

    /// Look up an atom by identity.
    pub fn get(&self, id: AtomId) -> &Atom {
        &self.atoms[id.index()]
    }

    /// Number of interned atoms.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// True if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Iterate over all interned atoms in interning order.
    pub fn iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms
            .iter()
            .enumerate()
            .map(|(i, atom)| (AtomId(i as u32), atom))
    }
}
