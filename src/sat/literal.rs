#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Variables and literals.
//!
//! A literal is stored as `2 * var + negated`, so the two literals of a variable sit next to
//! each other and a literal can index dense per-literal tables (watch lists) directly.

use core::ops::{Neg, Not};
use std::fmt::{Display, Formatter};

/// A propositional variable, identified by a positive integer (DIMACS numbering).
pub type Variable = u32;

/// A variable together with a polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Literal(u32);

impl Literal {
    /// Creates the literal of `var` with the given polarity (`true` is the positive literal).
    /// `var` must be at most `i32::MAX`.
    #[must_use]
    pub const fn new(var: Variable, polarity: bool) -> Self {
        if polarity {
            Self(var << 1)
        } else {
            Self((var << 1) | 1)
        }
    }

    /// The variable of this literal.
    #[must_use]
    pub const fn variable(self) -> Variable {
        self.0 >> 1
    }

    /// `true` for the positive literal of the variable.
    #[must_use]
    pub const fn polarity(self) -> bool {
        self.0 & 1 == 0
    }

    #[must_use]
    pub const fn is_negated(self) -> bool {
        !self.polarity()
    }

    /// The complementary literal.
    #[must_use]
    pub const fn negated(self) -> Self {
        Self(self.0 ^ 1)
    }

    /// Dense index of the literal, suitable for per-literal tables of size `2 * (num_vars + 1)`.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Converts a DIMACS literal. `0` has no variable and yields `None`, as does `i32::MIN`,
    /// whose variable `2^31` does not fit the encoding.
    #[must_use]
    pub const fn from_i32(value: i32) -> Option<Self> {
        if value == 0 || value == i32::MIN {
            return None;
        }
        Some(Self::new(value.unsigned_abs(), value > 0))
    }

    /// Converts back to a DIMACS literal.
    ///
    /// # Panics
    ///
    /// If the variable does not fit in an `i32`.
    #[must_use]
    pub fn to_i32(self) -> i32 {
        let var = i32::try_from(self.variable()).expect("variable does not fit in a DIMACS literal");
        if self.polarity() { var } else { -var }
    }
}

impl Not for Literal {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.negated()
    }
}

impl Neg for Literal {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negated()
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.polarity() {
            write!(f, "{}", self.variable())
        } else {
            write!(f, "-{}", self.variable())
        }
    }
}
