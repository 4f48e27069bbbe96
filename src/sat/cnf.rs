#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! The formula store: original clauses followed by the learnt clause pool.
//!
//! Clauses `0..non_learnt_idx` are the input formula and never change. Learnt clauses are
//! appended behind them by the solver and may be compacted away by the clause database
//! manager. Clause indices are the references used by the trail (as reasons) and by the
//! propagators (in watch lists).

use crate::sat::clause::Clause;
use crate::sat::error::{InvalidClause, Result, SolverError};
use crate::sat::literal::{Literal, Variable};
use crate::sat::solver::Solutions;
use core::ops::{Index, IndexMut};
use std::fmt::{Display, Formatter};

pub type DecisionLevel = usize;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cnf {
    pub clauses: Vec<Clause>,
    /// Number of variables; variables are `1..=num_vars`.
    pub num_vars: usize,
    /// Index of the first learnt clause.
    pub non_learnt_idx: usize,
}

impl Cnf {
    /// Builds a formula from DIMACS-style clauses. The variable count is the largest variable
    /// mentioned.
    ///
    /// # Errors
    ///
    /// `SolverError::InvalidFormula` for a `0` or `i32::MIN` literal or a tautological clause.
    pub fn new<I, J>(clauses: I) -> Result<Self>
    where
        I: IntoIterator<Item = J>,
        J: IntoIterator<Item = i32>,
    {
        let raw: Vec<Vec<i32>> = clauses
            .into_iter()
            .map(|c| c.into_iter().collect())
            .collect();
        let num_vars = raw
            .iter()
            .flatten()
            .map(|l| l.unsigned_abs() as usize)
            .max()
            .unwrap_or(0);
        Self::with_num_vars(num_vars, raw)
    }

    /// Builds a formula over the variables `1..=num_vars`, which may include variables that
    /// appear in no clause; they still receive a value in every model.
    ///
    /// # Errors
    ///
    /// `SolverError::InvalidFormula` for a `0` literal, a variable above `num_vars` or a
    /// tautological clause.
    pub fn with_num_vars<I, J>(num_vars: usize, clauses: I) -> Result<Self>
    where
        I: IntoIterator<Item = J>,
        J: IntoIterator<Item = i32>,
    {
        let declared = u32::try_from(num_vars).map_err(|_| {
            SolverError::InvalidOption(format!("{num_vars} variables exceed the supported range"))
        })?;

        let mut parsed = Vec::new();
        for (idx, raw) in clauses.into_iter().enumerate() {
            let invalid = |reason| SolverError::InvalidFormula { clause: idx, reason };

            let mut literals = Vec::new();
            for value in raw {
                let lit = Literal::from_i32(value).ok_or_else(|| {
                    invalid(if value == 0 {
                        InvalidClause::ZeroLiteral
                    } else {
                        InvalidClause::LiteralOutOfRange(value)
                    })
                })?;
                if lit.variable() > declared {
                    return Err(invalid(InvalidClause::UndeclaredVariable {
                        var: lit.variable(),
                        num_vars: declared,
                    }));
                }
                literals.push(lit);
            }

            parsed.push(Clause::new(literals).map_err(invalid)?);
        }

        Ok(Self {
            non_learnt_idx: parsed.len(),
            clauses: parsed,
            num_vars,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter()
    }

    /// The input clauses.
    #[must_use]
    pub fn original_clauses(&self) -> &[Clause] {
        &self.clauses[..self.non_learnt_idx]
    }

    /// Learnt clauses currently in the store, with their indices.
    pub fn learnt_clauses(&self) -> impl Iterator<Item = (usize, &Clause)> {
        self.clauses
            .iter()
            .enumerate()
            .skip(self.non_learnt_idx)
            .filter(|(_, c)| !c.is_deleted())
    }

    #[must_use]
    pub fn num_learnt(&self) -> usize {
        self.learnt_clauses().count()
    }

    /// Total number of literal occurrences in the input clauses.
    #[must_use]
    pub fn num_literals(&self) -> usize {
        self.original_clauses().iter().map(Clause::len).sum()
    }

    /// Appends a clause and returns its index.
    pub fn add_clause(&mut self, clause: Clause) -> usize {
        self.clauses.push(clause);
        self.clauses.len() - 1
    }

    #[must_use]
    pub fn has_empty_clause(&self) -> bool {
        self.original_clauses().iter().any(Clause::is_empty)
    }

    /// All variables of the formula in increasing order.
    pub fn variables(&self) -> impl Iterator<Item = Variable> {
        (1..=self.num_vars).filter_map(|v| Variable::try_from(v).ok())
    }

    /// Checks that `solutions` satisfies every input clause.
    #[must_use]
    pub fn verify(&self, solutions: &Solutions) -> bool {
        self.original_clauses()
            .iter()
            .all(|c| c.is_satisfied_by(|lit| solutions.literal_value(lit)))
    }
}

impl Index<usize> for Cnf {
    type Output = Clause;

    fn index(&self, index: usize) -> &Self::Output {
        &self.clauses[index]
    }
}

impl IndexMut<usize> for Cnf {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.clauses[index]
    }
}

/// Writes the input clauses in DIMACS format.
impl Display for Cnf {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "p cnf {} {}", self.num_vars, self.non_learnt_idx)?;
        for clause in self.original_clauses() {
            for lit in clause.iter() {
                write!(f, "{lit} ")?;
            }
            writeln!(f, "0")?;
        }
        Ok(())
    }
}
