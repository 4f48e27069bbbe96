#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Unit propagation.
//!
//! A propagator takes the assignments on the trail that have not been propagated yet and
//! repeatedly assigns the last free literal of every clause whose other literals are all
//! false, recording that clause as the reason. It stops at a fixpoint, or as soon as some
//! clause has every literal false, in which case the index of that clause is returned.
//!
//! Two implementations are provided:
//! - `WatchedLiterals`: the two-watched-literal scheme. Each clause of length two or more
//!   watches its first two literals; a clause is only visited when one of its watches
//!   becomes false.
//! - `UnitSearch`: scans the whole clause store in insertion order until nothing changes.
//!   Slow, but obviously correct, which makes it a useful reference.
//!
//! Both are deterministic: for a fixed formula and trail they visit clauses in the same
//! order and therefore produce the same assignments and the same conflict.

use crate::sat::assignment::Assignment;
use crate::sat::clause::Clause;
use crate::sat::cnf::Cnf;
use crate::sat::literal::Literal;
use crate::sat::trail::{Reason, Trail};
use clap::ValueEnum;
use smallvec::SmallVec;
use std::fmt::{Debug, Display};
use std::ops::{Index, IndexMut};

/// Interface shared by all unit propagators.
pub trait Propagator: Debug + Clone {
    /// Creates the propagator and registers every clause of `cnf`.
    fn new(cnf: &Cnf) -> Self;

    /// Registers a clause that was just added to the store at index `idx`.
    fn add_clause(&mut self, clause: &Clause, idx: usize);

    /// Forgets a single clause, e.g. before its literals are reordered.
    fn remove_clause(&mut self, clause: &Clause, idx: usize);

    /// Forgets every clause with index `>= learnt_idx` (the store is about to be compacted).
    fn cleanup_learnt(&mut self, learnt_idx: usize);

    /// Propagates every pending trail entry. Returns the index of a falsified clause on
    /// conflict, `None` at fixpoint.
    fn propagate(
        &mut self,
        trail: &mut Trail,
        assignment: &mut Assignment,
        cnf: &mut Cnf,
    ) -> Option<usize>;

    /// Number of literals assigned by propagation so far.
    fn num_propagations(&self) -> usize;
}

/// Watch lists indexed by literal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchedLiterals {
    watches: Vec<SmallVec<[usize; 6]>>,
    propagations: usize,
}

impl Index<Literal> for WatchedLiterals {
    type Output = SmallVec<[usize; 6]>;

    fn index(&self, index: Literal) -> &Self::Output {
        &self.watches[index.index()]
    }
}

impl IndexMut<Literal> for WatchedLiterals {
    fn index_mut(&mut self, index: Literal) -> &mut Self::Output {
        &mut self.watches[index.index()]
    }
}

impl WatchedLiterals {
    /// Visits the clauses watching `false_lit`, which has just become false. Clauses that
    /// find another non-false literal move to that literal's watch list; the rest stay.
    fn propagate_false_literal(
        &mut self,
        false_lit: Literal,
        trail: &mut Trail,
        assignment: &mut Assignment,
        cnf: &mut Cnf,
    ) -> Option<usize> {
        let mut watchers = std::mem::take(&mut self[false_lit]);
        let mut conflict = None;
        let mut kept = 0;
        let mut i = 0;

        while i < watchers.len() {
            let c_ref = watchers[i];
            i += 1;

            let clause = &mut cnf[c_ref];
            if clause.is_deleted() {
                continue;
            }

            if clause[0] == false_lit {
                clause.swap(0, 1);
            }
            debug_assert_eq!(clause[1], false_lit);

            let other = clause[0];
            if assignment.literal_value(other) == Some(true) {
                watchers[kept] = c_ref;
                kept += 1;
                continue;
            }

            let replacement =
                (2..clause.len()).find(|&k| assignment.literal_value(clause[k]) != Some(false));
            if let Some(k) = replacement {
                clause.swap(1, k);
                let new_watch = clause[1];
                self[new_watch].push(c_ref);
                continue;
            }

            watchers[kept] = c_ref;
            kept += 1;

            if assignment.literal_value(other) == Some(false) {
                conflict = Some(c_ref);
                while i < watchers.len() {
                    watchers[kept] = watchers[i];
                    kept += 1;
                    i += 1;
                }
                break;
            }

            trail.push(assignment, other, Reason::Clause(c_ref));
            self.propagations += 1;
        }

        watchers.truncate(kept);
        self[false_lit] = watchers;
        conflict
    }
}

impl Propagator for WatchedLiterals {
    fn new(cnf: &Cnf) -> Self {
        let mut wl = Self {
            watches: vec![SmallVec::new(); 2 * (cnf.num_vars + 1)],
            propagations: 0,
        };
        for (idx, clause) in cnf.iter().enumerate() {
            if !clause.is_deleted() {
                wl.add_clause(clause, idx);
            }
        }
        wl
    }

    /// Watches the first two literals. Unit and empty clauses are never watched; the
    /// driver asserts unit clauses directly.
    fn add_clause(&mut self, clause: &Clause, idx: usize) {
        if clause.len() < 2 {
            return;
        }
        let a = clause[0];
        let b = clause[1];
        debug_assert_ne!(a, b);

        self[a].push(idx);
        self[b].push(idx);
    }

    fn remove_clause(&mut self, clause: &Clause, idx: usize) {
        if clause.len() < 2 {
            return;
        }
        let a = clause[0];
        let b = clause[1];
        self[a].retain(|c| *c != idx);
        self[b].retain(|c| *c != idx);
    }

    fn cleanup_learnt(&mut self, learnt_idx: usize) {
        for list in &mut self.watches {
            list.retain(|c| *c < learnt_idx);
        }
    }

    fn propagate(
        &mut self,
        trail: &mut Trail,
        assignment: &mut Assignment,
        cnf: &mut Cnf,
    ) -> Option<usize> {
        while trail.curr_idx < trail.len() {
            let lit = trail[trail.curr_idx].lit;
            trail.curr_idx += 1;

            if let Some(c_ref) = self.propagate_false_literal(!lit, trail, assignment, cnf) {
                return Some(c_ref);
            }
        }
        None
    }

    fn num_propagations(&self) -> usize {
        self.propagations
    }
}

/// Scans every clause in insertion order until no clause is unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitSearch {
    propagations: usize,
}

/// What a single clause says under the current assignment.
enum ClauseStatus {
    Satisfied,
    Falsified,
    Unit(Literal),
    Unresolved,
}

impl UnitSearch {
    fn status(clause: &Clause, assignment: &Assignment) -> ClauseStatus {
        let mut free = None;
        let mut free_count = 0;

        for &lit in clause.iter() {
            match assignment.literal_value(lit) {
                Some(true) => return ClauseStatus::Satisfied,
                Some(false) => {}
                None => {
                    free_count += 1;
                    free = Some(lit);
                }
            }
        }

        match (free_count, free) {
            (0, _) => ClauseStatus::Falsified,
            (1, Some(lit)) => ClauseStatus::Unit(lit),
            _ => ClauseStatus::Unresolved,
        }
    }
}

impl Propagator for UnitSearch {
    fn new(_cnf: &Cnf) -> Self {
        Self::default()
    }

    fn add_clause(&mut self, _clause: &Clause, _idx: usize) {}

    fn remove_clause(&mut self, _clause: &Clause, _idx: usize) {}

    fn cleanup_learnt(&mut self, _learnt_idx: usize) {}

    fn propagate(
        &mut self,
        trail: &mut Trail,
        assignment: &mut Assignment,
        cnf: &mut Cnf,
    ) -> Option<usize> {
        if trail.curr_idx >= trail.len() {
            return None;
        }

        loop {
            let mut changed = false;

            for (c_ref, clause) in cnf.iter().enumerate() {
                if clause.is_deleted() || clause.is_empty() {
                    continue;
                }
                match Self::status(clause, assignment) {
                    ClauseStatus::Falsified => {
                        trail.curr_idx = trail.len();
                        return Some(c_ref);
                    }
                    ClauseStatus::Unit(lit) => {
                        trail.push(assignment, lit, Reason::Clause(c_ref));
                        self.propagations += 1;
                        changed = true;
                    }
                    ClauseStatus::Satisfied | ClauseStatus::Unresolved => {}
                }
            }

            if !changed {
                trail.curr_idx = trail.len();
                return None;
            }
        }
    }

    fn num_propagations(&self) -> usize {
        self.propagations
    }
}

/// Runtime choice between the propagators.
#[derive(Debug, Clone)]
pub enum PropagatorImpls {
    WatchedLiterals(WatchedLiterals),
    UnitSearch(UnitSearch),
}

impl Propagator for PropagatorImpls {
    fn new(cnf: &Cnf) -> Self {
        Self::WatchedLiterals(WatchedLiterals::new(cnf))
    }

    fn add_clause(&mut self, clause: &Clause, idx: usize) {
        match self {
            Self::WatchedLiterals(p) => p.add_clause(clause, idx),
            Self::UnitSearch(p) => p.add_clause(clause, idx),
        }
    }

    fn remove_clause(&mut self, clause: &Clause, idx: usize) {
        match self {
            Self::WatchedLiterals(p) => p.remove_clause(clause, idx),
            Self::UnitSearch(p) => p.remove_clause(clause, idx),
        }
    }

    fn cleanup_learnt(&mut self, learnt_idx: usize) {
        match self {
            Self::WatchedLiterals(p) => p.cleanup_learnt(learnt_idx),
            Self::UnitSearch(p) => p.cleanup_learnt(learnt_idx),
        }
    }

    fn propagate(
        &mut self,
        trail: &mut Trail,
        assignment: &mut Assignment,
        cnf: &mut Cnf,
    ) -> Option<usize> {
        match self {
            Self::WatchedLiterals(p) => p.propagate(trail, assignment, cnf),
            Self::UnitSearch(p) => p.propagate(trail, assignment, cnf),
        }
    }

    fn num_propagations(&self) -> usize {
        match self {
            Self::WatchedLiterals(p) => p.num_propagations(),
            Self::UnitSearch(p) => p.num_propagations(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum PropagatorType {
    /// Two watched literals per clause
    #[default]
    WatchedLiterals,
    /// Full scan of the clause store
    UnitSearch,
}

impl Display for PropagatorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WatchedLiterals => write!(f, "watched-literals"),
            Self::UnitSearch => write!(f, "unit-search"),
        }
    }
}

impl PropagatorType {
    #[must_use]
    pub fn to_impl(self, cnf: &Cnf) -> PropagatorImpls {
        match self {
            Self::WatchedLiterals => PropagatorImpls::WatchedLiterals(WatchedLiterals::new(cnf)),
            Self::UnitSearch => PropagatorImpls::UnitSearch(UnitSearch::new(cnf)),
        }
    }
}
