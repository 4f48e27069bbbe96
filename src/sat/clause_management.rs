#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Management of the learnt clause database.
//!
//! Every conflict adds a learnt clause, so without pruning the store grows without bound
//! and propagation slows down. A clause manager decides which learnt clauses stay:
//! - New learnt clauses are inserted through `ClauseManagement::add_learnt`, which drops
//!   exact duplicates of clauses already in the store and registers the clause with the
//!   propagator.
//! - Clause activities are bumped for every clause used in conflict analysis and decay
//!   after each conflict, so recently useful clauses score higher.
//! - When the number of learnt clauses exceeds a soft cap, the worse half of the
//!   removable clauses is deleted.
//!
//! Original clauses are never touched. Clauses that are currently the reason of a trail
//! assignment are locked and survive until a later reduction.

use crate::sat::clause::{Clause, LiteralStorage};
use crate::sat::cnf::Cnf;
use crate::sat::propagation::Propagator;
use crate::sat::solver::SolverOptions;
use crate::sat::trail::Trail;
use clap::ValueEnum;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::fmt::{Debug, Display};
use tracing::debug;

/// Divisor applied to the clause activity increment after every conflict.
const CLAUSE_DECAY: f64 = 0.999;
const ACTIVITY_RESCALE_LIMIT: f64 = 1e20;
/// Clauses with at most this many distinct decision levels are never pruned.
const GLUE_LBD: u32 = 2;

/// Interface for clause database management strategies.
pub trait ClauseManagement: Clone + Debug {
    /// Creates the manager for a freshly loaded formula.
    fn new(cnf: &Cnf, options: &SolverOptions) -> Self;

    /// Stores a learnt clause and registers it with `propagator`, returning its index.
    ///
    /// If an identical clause is already stored, that clause takes the literal order of
    /// `clause` (so the asserting literal is watched) and its index is returned instead.
    fn add_learnt<P: Propagator>(&mut self, cnf: &mut Cnf, propagator: &mut P, clause: Clause)
    -> usize;

    /// Called once per conflict, after the learnt clause was added.
    fn on_conflict(&mut self, cnf: &mut Cnf);

    /// Rewards the clauses that took part in the last conflict analysis.
    fn bump_involved_clause_activities(&mut self, cnf: &mut Cnf, clauses: &[usize]);

    /// Whether the learnt clause database is over its size limit.
    fn should_clean_db(&self, cnf: &Cnf) -> bool;

    /// Deletes low-priority learnt clauses and compacts the store, renumbering reasons on
    /// the trail and the propagator's clause references. Returns the number deleted.
    fn clean_clause_db<P: Propagator>(
        &mut self,
        cnf: &mut Cnf,
        trail: &mut Trail,
        propagator: &mut P,
    ) -> usize;

    /// Learnt clauses deleted so far.
    fn num_removed(&self) -> usize;
}

/// Sorted-literal keys of the learnt clauses in the store, for duplicate detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LearntIndex(FxHashMap<LiteralStorage, usize>);

impl LearntIndex {
    fn insert<P: Propagator>(&mut self, cnf: &mut Cnf, propagator: &mut P, clause: Clause) -> usize {
        let key = clause.sorted_key();
        if let Some(&idx) = self.0.get(&key) {
            propagator.remove_clause(&cnf[idx], idx);
            cnf[idx].reorder(clause.literals().iter().copied().collect());
            propagator.add_clause(&cnf[idx], idx);
            return idx;
        }

        let idx = cnf.add_clause(clause);
        propagator.add_clause(&cnf[idx], idx);
        self.0.insert(key, idx);
        idx
    }

    fn rebuild(&mut self, cnf: &Cnf) {
        self.0.clear();
        for (idx, clause) in cnf.learnt_clauses() {
            self.0.insert(clause.sorted_key(), idx);
        }
    }
}

/// Prunes by Literal Block Distance, then activity.
///
/// Glue clauses (LBD at most 2) are always kept. Among the other unlocked learnt clauses,
/// higher LBD is worse, then lower activity, then the older clause. After each reduction
/// the limit grows by a tenth.
#[derive(Debug, Clone, PartialEq)]
pub struct LbdClauseManagement {
    limit: usize,
    increment: f64,
    num_removed: usize,
    learnt: LearntIndex,

    /// Removal candidates: (index, lbd, activity).
    candidates: Vec<(usize, u32, f64)>,
    indices_to_remove: FxHashSet<usize>,
    old_to_new_idx_map: FxHashMap<usize, usize>,
}

impl LbdClauseManagement {
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Worse clauses order first.
    fn removal_order(a: &(usize, u32, f64), b: &(usize, u32, f64)) -> Ordering {
        let (idx_a, lbd_a, act_a) = a;
        let (idx_b, lbd_b, act_b) = b;
        lbd_b
            .cmp(lbd_a)
            .then_with(|| act_a.total_cmp(act_b))
            .then_with(|| idx_a.cmp(idx_b))
    }
}

impl ClauseManagement for LbdClauseManagement {
    fn new(cnf: &Cnf, options: &SolverOptions) -> Self {
        let mut learnt = LearntIndex::default();
        learnt.rebuild(cnf);
        Self {
            limit: options.learned_clause_limit,
            increment: 1.0,
            num_removed: 0,
            learnt,
            candidates: Vec::new(),
            indices_to_remove: FxHashSet::default(),
            old_to_new_idx_map: FxHashMap::default(),
        }
    }

    fn add_learnt<P: Propagator>(
        &mut self,
        cnf: &mut Cnf,
        propagator: &mut P,
        clause: Clause,
    ) -> usize {
        self.learnt.insert(cnf, propagator, clause)
    }

    fn on_conflict(&mut self, cnf: &mut Cnf) {
        self.increment /= CLAUSE_DECAY;
        if self.increment > ACTIVITY_RESCALE_LIMIT {
            let start = cnf.non_learnt_idx;
            for clause in &mut cnf.clauses[start..] {
                clause.decay_activity(1.0 / ACTIVITY_RESCALE_LIMIT);
            }
            self.increment /= ACTIVITY_RESCALE_LIMIT;
        }
    }

    fn bump_involved_clause_activities(&mut self, cnf: &mut Cnf, clauses: &[usize]) {
        for &idx in clauses {
            if idx >= cnf.non_learnt_idx {
                cnf[idx].bump_activity(self.increment);
            }
        }
    }

    fn should_clean_db(&self, cnf: &Cnf) -> bool {
        cnf.len() - cnf.non_learnt_idx > self.limit
    }

    fn clean_clause_db<P: Propagator>(
        &mut self,
        cnf: &mut Cnf,
        trail: &mut Trail,
        propagator: &mut P,
    ) -> usize {
        let learnt_start_idx = cnf.non_learnt_idx;
        let locked = trail.get_locked_clauses();
        let num_unlocked = (learnt_start_idx..cnf.len())
            .filter(|idx| !locked.contains(idx))
            .count();

        self.candidates.clear();
        for idx in learnt_start_idx..cnf.len() {
            let clause = &cnf[idx];
            if clause.lbd > GLUE_LBD && !locked.contains(&idx) {
                self.candidates.push((idx, clause.lbd, clause.activity()));
            }
        }

        let num_to_remove = (num_unlocked / 2).min(self.candidates.len());
        if num_to_remove > 0 {
            if num_to_remove < self.candidates.len() {
                self.candidates
                    .select_nth_unstable_by(num_to_remove, Self::removal_order);
            }

            self.indices_to_remove.clear();
            for &(idx, _, _) in &self.candidates[..num_to_remove] {
                self.indices_to_remove.insert(idx);
                cnf[idx].delete();
            }

            self.old_to_new_idx_map.clear();
            let mut kept = Vec::with_capacity(cnf.len() - learnt_start_idx - num_to_remove);
            for (old_idx, clause) in cnf.clauses.drain(learnt_start_idx..).enumerate() {
                let old_idx = old_idx + learnt_start_idx;
                if !self.indices_to_remove.contains(&old_idx) {
                    self.old_to_new_idx_map
                        .insert(old_idx, learnt_start_idx + kept.len());
                    kept.push(clause);
                }
            }
            cnf.clauses.append(&mut kept);

            trail.remap_clause_indices(&self.old_to_new_idx_map);
            propagator.cleanup_learnt(learnt_start_idx);
            for idx in learnt_start_idx..cnf.len() {
                propagator.add_clause(&cnf[idx], idx);
            }
            self.learnt.rebuild(cnf);
            self.num_removed += num_to_remove;
        }

        self.limit += self.limit / 10 + 1;
        debug!(
            removed = num_to_remove,
            kept = cnf.len() - learnt_start_idx,
            limit = self.limit,
            "reduced learnt clause database"
        );
        num_to_remove
    }

    fn num_removed(&self) -> usize {
        self.num_removed
    }
}

/// Keeps every learnt clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoClauseManagement {
    learnt: LearntIndex,
}

impl ClauseManagement for NoClauseManagement {
    fn new(cnf: &Cnf, _options: &SolverOptions) -> Self {
        let mut learnt = LearntIndex::default();
        learnt.rebuild(cnf);
        Self { learnt }
    }

    fn add_learnt<P: Propagator>(
        &mut self,
        cnf: &mut Cnf,
        propagator: &mut P,
        clause: Clause,
    ) -> usize {
        self.learnt.insert(cnf, propagator, clause)
    }

    fn on_conflict(&mut self, _cnf: &mut Cnf) {}

    fn bump_involved_clause_activities(&mut self, _cnf: &mut Cnf, _clauses: &[usize]) {}

    fn should_clean_db(&self, _cnf: &Cnf) -> bool {
        false
    }

    fn clean_clause_db<P: Propagator>(
        &mut self,
        _cnf: &mut Cnf,
        _trail: &mut Trail,
        _propagator: &mut P,
    ) -> usize {
        0
    }

    fn num_removed(&self) -> usize {
        0
    }
}

/// Possible clause management implementations
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseManagementImpls {
    NoClauseManagement(NoClauseManagement),
    LbdClauseManagement(LbdClauseManagement),
}

impl ClauseManagement for ClauseManagementImpls {
    fn new(cnf: &Cnf, options: &SolverOptions) -> Self {
        Self::LbdClauseManagement(LbdClauseManagement::new(cnf, options))
    }

    fn add_learnt<P: Propagator>(
        &mut self,
        cnf: &mut Cnf,
        propagator: &mut P,
        clause: Clause,
    ) -> usize {
        match self {
            Self::NoClauseManagement(m) => m.add_learnt(cnf, propagator, clause),
            Self::LbdClauseManagement(m) => m.add_learnt(cnf, propagator, clause),
        }
    }

    fn on_conflict(&mut self, cnf: &mut Cnf) {
        match self {
            Self::NoClauseManagement(m) => m.on_conflict(cnf),
            Self::LbdClauseManagement(m) => m.on_conflict(cnf),
        }
    }

    fn bump_involved_clause_activities(&mut self, cnf: &mut Cnf, clauses: &[usize]) {
        match self {
            Self::NoClauseManagement(m) => m.bump_involved_clause_activities(cnf, clauses),
            Self::LbdClauseManagement(m) => m.bump_involved_clause_activities(cnf, clauses),
        }
    }

    fn should_clean_db(&self, cnf: &Cnf) -> bool {
        match self {
            Self::NoClauseManagement(m) => m.should_clean_db(cnf),
            Self::LbdClauseManagement(m) => m.should_clean_db(cnf),
        }
    }

    fn clean_clause_db<P: Propagator>(
        &mut self,
        cnf: &mut Cnf,
        trail: &mut Trail,
        propagator: &mut P,
    ) -> usize {
        match self {
            Self::NoClauseManagement(m) => m.clean_clause_db(cnf, trail, propagator),
            Self::LbdClauseManagement(m) => m.clean_clause_db(cnf, trail, propagator),
        }
    }

    fn num_removed(&self) -> usize {
        match self {
            Self::NoClauseManagement(m) => m.num_removed(),
            Self::LbdClauseManagement(m) => m.num_removed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Copy, Hash, Default, ValueEnum)]
pub enum ClauseManagementType {
    /// Keep every learnt clause
    NoClauseManagement,
    /// Prune by LBD and activity
    #[default]
    LbdClauseManagement,
}

impl Display for ClauseManagementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoClauseManagement => write!(f, "none"),
            Self::LbdClauseManagement => write!(f, "lbd"),
        }
    }
}

impl ClauseManagementType {
    #[must_use]
    pub fn to_impl(self, cnf: &Cnf, options: &SolverOptions) -> ClauseManagementImpls {
        match self {
            Self::NoClauseManagement => {
                ClauseManagementImpls::NoClauseManagement(NoClauseManagement::new(cnf, options))
            }
            Self::LbdClauseManagement => {
                ClauseManagementImpls::LbdClauseManagement(LbdClauseManagement::new(cnf, options))
            }
        }
    }
}
