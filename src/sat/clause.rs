#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Clauses: disjunctions of literals.
//!
//! Original and learnt clauses share one representation. The `learnt` flag decides whether
//! the clause database manager may ever delete the clause; original clauses are immutable
//! for the whole solve.

use crate::sat::error::InvalidClause;
use crate::sat::literal::{Literal, Variable};
use core::ops::{Index, IndexMut};
use itertools::Itertools;
use smallvec::SmallVec;

/// Inline storage for clause literals; most clauses in practice are short.
pub type LiteralStorage = SmallVec<[Literal; 8]>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Clause {
    literals: LiteralStorage,
    /// Number of distinct decision levels among the literals when the clause was learnt.
    pub lbd: u32,
    activity: f64,
    learnt: bool,
    deleted: bool,
}

impl Clause {
    /// Builds an original clause.
    ///
    /// Duplicate literals are dropped (first occurrence kept, order otherwise preserved).
    ///
    /// # Errors
    ///
    /// `InvalidClause::Tautology` if the clause contains both polarities of a variable.
    pub fn new<I: IntoIterator<Item = Literal>>(literals: I) -> Result<Self, InvalidClause> {
        let literals: LiteralStorage = literals.into_iter().unique().collect();

        if let Some(var) = Self::complementary_variable(&literals) {
            return Err(InvalidClause::Tautology(var));
        }

        Ok(Self {
            literals,
            ..Self::default()
        })
    }

    /// Builds a learnt clause. The analyzer guarantees the literals are distinct and
    /// non-complementary, so no normalisation happens here.
    #[must_use]
    pub fn learnt(literals: LiteralStorage, lbd: u32) -> Self {
        debug_assert!(Self::complementary_variable(&literals).is_none());
        Self {
            literals,
            lbd,
            activity: 0.0,
            learnt: true,
            deleted: false,
        }
    }

    fn complementary_variable(literals: &[Literal]) -> Option<Variable> {
        literals
            .iter()
            .sorted_unstable()
            .tuple_windows()
            .find(|(a, b)| a.variable() == b.variable())
            .map(|(a, _)| a.variable())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    #[must_use]
    pub fn is_unit(&self) -> bool {
        self.len() == 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.literals.iter()
    }

    #[must_use]
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn swap(&mut self, i: usize, j: usize) {
        self.literals.swap(i, j);
    }

    /// Replaces the literal order, keeping the same set of literals.
    pub fn reorder(&mut self, literals: LiteralStorage) {
        debug_assert_eq!(self.sorted_key(), {
            let mut key = literals.clone();
            key.sort_unstable();
            key
        });
        self.literals = literals;
    }

    /// The literals in canonical (sorted) order, used to detect identical clauses.
    #[must_use]
    pub fn sorted_key(&self) -> LiteralStorage {
        let mut key = self.literals.clone();
        key.sort_unstable();
        key
    }

    #[must_use]
    pub const fn is_learnt(&self) -> bool {
        self.learnt
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub const fn delete(&mut self) {
        self.deleted = true;
    }

    #[must_use]
    pub const fn activity(&self) -> f64 {
        self.activity
    }

    pub fn bump_activity(&mut self, amount: f64) {
        self.activity += amount;
    }

    pub fn decay_activity(&mut self, factor: f64) {
        self.activity *= factor;
    }

    /// `true` if some literal is satisfied by `value`.
    pub fn is_satisfied_by<F: Fn(Literal) -> Option<bool>>(&self, value: F) -> bool {
        self.iter().any(|&lit| value(lit) == Some(true))
    }
}

impl Index<usize> for Clause {
    type Output = Literal;

    fn index(&self, index: usize) -> &Self::Output {
        &self.literals[index]
    }
}

impl IndexMut<usize> for Clause {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.literals[index]
    }
}

impl From<&Clause> for Vec<Literal> {
    fn from(clause: &Clause) -> Self {
        clause.literals.to_vec()
    }
}
