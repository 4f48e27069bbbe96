#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Current truth values of the variables.

use crate::sat::literal::{Literal, Variable};
use crate::sat::solver::Solutions;
use core::ops::{Index, IndexMut};

#[derive(Debug, Clone, PartialEq, Eq, Copy, Default, Hash, PartialOrd, Ord)]
pub enum VarState {
    #[default]
    Unassigned,
    Assigned(bool),
}

impl VarState {
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        matches!(self, Self::Assigned(_))
    }

    #[must_use]
    pub const fn is_unassigned(self) -> bool {
        !self.is_assigned()
    }

    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::Assigned(true))
    }

    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::Assigned(false))
    }
}

/// Dense per-variable values; slot 0 is unused so variables index directly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment {
    states: Vec<VarState>,
    num_assigned: usize,
}

impl Index<Variable> for Assignment {
    type Output = VarState;

    fn index(&self, index: Variable) -> &Self::Output {
        &self.states[index as usize]
    }
}

impl IndexMut<Variable> for Assignment {
    fn index_mut(&mut self, index: Variable) -> &mut Self::Output {
        &mut self.states[index as usize]
    }
}

impl Assignment {
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self {
            states: vec![VarState::Unassigned; num_vars + 1],
            num_assigned: 0,
        }
    }

    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.states.len() - 1
    }

    /// Makes `lit` true.
    pub fn assign(&mut self, lit: Literal) {
        let slot = &mut self[lit.variable()];
        debug_assert!(slot.is_unassigned(), "variable {} assigned twice", lit.variable());
        *slot = VarState::Assigned(lit.polarity());
        self.num_assigned += 1;
    }

    pub fn unassign(&mut self, var: Variable) {
        let slot = &mut self[var];
        if slot.is_assigned() {
            *slot = VarState::Unassigned;
            self.num_assigned -= 1;
        }
    }

    #[must_use]
    pub fn is_assigned(&self, var: Variable) -> bool {
        self[var].is_assigned()
    }

    #[must_use]
    pub const fn num_assigned(&self) -> usize {
        self.num_assigned
    }

    #[must_use]
    pub fn all_assigned(&self) -> bool {
        self.num_assigned == self.num_vars()
    }

    #[must_use]
    pub fn var_value(&self, var: Variable) -> Option<bool> {
        match self.states.get(var as usize) {
            Some(VarState::Assigned(b)) => Some(*b),
            _ => None,
        }
    }

    /// Value of a literal: `Some(true)` if satisfied, `Some(false)` if falsified.
    #[must_use]
    pub fn literal_value(&self, lit: Literal) -> Option<bool> {
        self.var_value(lit.variable()).map(|b| b == lit.polarity())
    }

    pub fn unassigned(&self) -> impl Iterator<Item = Variable> + '_ {
        self.states
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, s)| s.is_unassigned())
            .filter_map(|(i, _)| Variable::try_from(i).ok())
    }

    /// The model of a complete assignment. Unassigned variables are reported as false.
    #[must_use]
    pub fn get_solutions(&self) -> Solutions {
        Solutions::from_values(self.states.iter().skip(1).map(|s| s.is_true()))
    }
}
