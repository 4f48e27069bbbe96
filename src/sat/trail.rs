#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! The assignment trail.
//!
//! Every assignment is appended as a `Step` carrying its decision level and the reason it
//! was made. Decision levels along the trail never decrease and grow by exactly one at each
//! decision; level 0 holds the facts that follow from the formula alone. Backjumping pops
//! whole levels off the end.

use crate::sat::assignment::Assignment;
use crate::sat::cnf::DecisionLevel;
use crate::sat::error::{Result, SolverError};
use crate::sat::literal::{Literal, Variable};
use rustc_hash::{FxHashMap, FxHashSet};
use std::ops::Index;

#[derive(Debug, Clone, PartialEq, Eq, Default, Copy, Hash, PartialOrd, Ord)]
pub enum Reason {
    /// A free choice made by the driver.
    #[default]
    Decision,
    /// Forced by the clause at this index in the formula store.
    Clause(usize),
}

impl Reason {
    #[must_use]
    pub const fn clause(self) -> Option<usize> {
        match self {
            Self::Decision => None,
            Self::Clause(idx) => Some(idx),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Step {
    pub lit: Literal,
    pub decision_level: DecisionLevel,
    pub reason: Reason,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trail {
    t: Vec<Step>,
    /// Propagation head: steps before this index have been propagated.
    pub curr_idx: usize,
    var_to_level: Vec<DecisionLevel>,
    var_to_pos: Vec<usize>,
    /// Trail length at the moment each decision level above 0 was opened.
    level_starts: Vec<usize>,
}

impl Index<usize> for Trail {
    type Output = Step;

    fn index(&self, index: usize) -> &Self::Output {
        &self.t[index]
    }
}

impl Trail {
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self {
            t: Vec::with_capacity(num_vars),
            curr_idx: 0,
            var_to_level: vec![0; num_vars + 1],
            var_to_pos: vec![0; num_vars + 1],
            level_starts: Vec::new(),
        }
    }

    #[must_use]
    pub fn decision_level(&self) -> DecisionLevel {
        self.level_starts.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.t.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.t.iter()
    }

    /// Decision level of an assigned variable. Meaningless for unassigned variables.
    #[must_use]
    pub fn level(&self, var: Variable) -> DecisionLevel {
        self.var_to_level[var as usize]
    }

    /// Reason of an assigned variable.
    #[must_use]
    pub fn reason(&self, var: Variable) -> Reason {
        self.t[self.var_to_pos[var as usize]].reason
    }

    /// Position of an assigned variable on the trail.
    #[must_use]
    pub fn position(&self, var: Variable) -> usize {
        self.var_to_pos[var as usize]
    }

    /// Assigns `lit` at the current decision level.
    pub fn push(&mut self, assignment: &mut Assignment, lit: Literal, reason: Reason) {
        let var = lit.variable() as usize;
        let level = self.decision_level();

        assignment.assign(lit);
        self.var_to_level[var] = level;
        self.var_to_pos[var] = self.t.len();
        self.t.push(Step {
            lit,
            decision_level: level,
            reason,
        });
    }

    /// Opens a new decision level and assigns the decision literal on it.
    pub fn push_decision(&mut self, assignment: &mut Assignment, lit: Literal) {
        self.level_starts.push(self.t.len());
        self.push(assignment, lit, Reason::Decision);
    }

    /// Pops every step above `level`, unassigning its variable and reporting the popped
    /// literal to `on_unassign` (latest first).
    ///
    /// # Errors
    ///
    /// `SolverError::InvariantViolation` if `level` is above the current decision level.
    pub fn backtrack_to<F: FnMut(Literal)>(
        &mut self,
        assignment: &mut Assignment,
        level: DecisionLevel,
        mut on_unassign: F,
    ) -> Result<()> {
        if level > self.decision_level() {
            return Err(SolverError::InvariantViolation(format!(
                "backjump to level {level} from level {}",
                self.decision_level()
            )));
        }
        if level == self.decision_level() {
            return Ok(());
        }

        let truncate_at = self.level_starts[level];
        for step in self.t.drain(truncate_at..).rev() {
            assignment.unassign(step.lit.variable());
            on_unassign(step.lit);
        }
        self.level_starts.truncate(level);
        self.curr_idx = self.curr_idx.min(truncate_at);
        Ok(())
    }

    /// Indices of clauses that are currently the reason of some assignment.
    #[must_use]
    pub fn get_locked_clauses(&self) -> FxHashSet<usize> {
        self.t.iter().filter_map(|s| s.reason.clause()).collect()
    }

    /// Rewrites reason indices after the clause store was compacted.
    pub fn remap_clause_indices(&mut self, map: &FxHashMap<usize, usize>) {
        for step in &mut self.t {
            if let Reason::Clause(idx) = step.reason {
                if let Some(&new_idx) = map.get(&idx) {
                    step.reason = Reason::Clause(new_idx);
                }
            }
        }
    }

    /// The literals decided so far, in order.
    pub fn decisions(&self) -> impl Iterator<Item = Literal> + '_ {
        self.level_starts.iter().map(|&i| self.t[i].lit)
    }

    /// Levels never decrease along the trail and grow by exactly one at each decision.
    #[must_use]
    pub fn levels_are_consistent(&self) -> bool {
        let mut expected = 0;
        for (i, step) in self.t.iter().enumerate() {
            if step.reason == Reason::Decision {
                expected += 1;
                if self.level_starts.get(expected - 1) != Some(&i) {
                    return false;
                }
            }
            if step.decision_level != expected {
                return false;
            }
        }
        expected == self.decision_level()
    }
}
