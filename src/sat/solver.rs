#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! The solver surface: the `Solver` trait, strategy configuration, run-time options and
//! the results and statistics of a solve.
//!
//! Strategies are chosen statically through a `SolverConfig`, whose associated types name
//! the propagator, branching heuristic, phase selector, restart schedule and clause manager.
//! `DefaultConfig` is the usual CDCL setup. `DynamicConfig` uses the `*Impls` enums of each
//! module so the choice can be made at run time, e.g. from command-line flags.

use crate::sat::clause_management::{ClauseManagement, ClauseManagementImpls, LbdClauseManagement};
use crate::sat::cnf::Cnf;
use crate::sat::error::{Result, SolverError};
use crate::sat::literal::{Literal, Variable};
use crate::sat::phase_saving::{PhaseSelector, PhaseSelectorImpls, SavedPhases};
use crate::sat::propagation::{Propagator, PropagatorImpls, WatchedLiterals};
use crate::sat::restarter::{Luby, Restarter, RestarterImpls};
use crate::sat::variable_selection::{VariableSelection, VariableSelectionImpls, Vsids};
use itertools::Itertools;
use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

/// Strategy selection for a solver.
pub trait SolverConfig: Debug + Clone {
    type Propagator: Propagator;
    type VariableSelector: VariableSelection;
    type PhaseSelector: PhaseSelector;
    type Restarter: Restarter;
    type ClauseManager: ClauseManagement;
}

/// Watched literals, VSIDS, phase saving, Luby restarts and LBD-based clause pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DefaultConfig;

impl SolverConfig for DefaultConfig {
    type Propagator = WatchedLiterals;
    type VariableSelector = Vsids;
    type PhaseSelector = SavedPhases;
    type Restarter = Luby;
    type ClauseManager = LbdClauseManagement;
}

/// Strategies picked at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DynamicConfig;

impl SolverConfig for DynamicConfig {
    type Propagator = PropagatorImpls;
    type VariableSelector = VariableSelectionImpls;
    type PhaseSelector = PhaseSelectorImpls;
    type Restarter = RestarterImpls;
    type ClauseManager = ClauseManagementImpls;
}

/// Tunable parameters and resource limits of a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// VSIDS decay factor, in `(0, 1)`.
    pub vsids_decay: f64,
    /// Conflicts per unit of the restart schedule.
    pub restart_base: usize,
    /// Soft cap on the number of learnt clauses before pruning.
    pub learned_clause_limit: usize,
    /// Give up with `Unknown` after this many conflicts. `None` is unbounded and
    /// `Some(0)` stops at the first decision.
    pub max_conflicts: Option<usize>,
    /// Give up with `Unknown` after this many decisions. `Some(0)` stops at the
    /// first decision, so only formulas settled by propagation get a verdict.
    pub max_decisions: Option<usize>,
    /// Give up with `Unknown` once this much time has passed since `solve` started.
    pub time_limit: Option<Duration>,
    /// Seed for every random choice the solver makes.
    pub seed: u64,
    /// Probability of flipping a saved phase, in `[0, 1]`.
    pub phase_noise: f64,
    /// Keep the sequence of decisions for inspection.
    pub record_decisions: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            vsids_decay: 0.95,
            restart_base: 100,
            learned_clause_limit: 10_000,
            max_conflicts: Some(1_000_000),
            max_decisions: None,
            time_limit: None,
            seed: 0,
            phase_noise: 0.0,
            record_decisions: false,
        }
    }
}

impl SolverOptions {
    /// Checks the tuning values. Search budgets are not checked: any budget,
    /// zero included, is a valid place to stop.
    ///
    /// # Errors
    ///
    /// `SolverError::InvalidOption` naming the first out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if !(self.vsids_decay > 0.0 && self.vsids_decay < 1.0) {
            return Err(SolverError::InvalidOption(format!(
                "vsids_decay must be in (0, 1), got {}",
                self.vsids_decay
            )));
        }
        if self.restart_base == 0 {
            return Err(SolverError::InvalidOption(
                "restart_base must be positive".to_string(),
            ));
        }
        if self.learned_clause_limit == 0 {
            return Err(SolverError::InvalidOption(
                "learned_clause_limit must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.phase_noise) {
            return Err(SolverError::InvalidOption(format!(
                "phase_noise must be in [0, 1], got {}",
                self.phase_noise
            )));
        }
        Ok(())
    }

    #[must_use]
    pub const fn with_vsids_decay(mut self, vsids_decay: f64) -> Self {
        self.vsids_decay = vsids_decay;
        self
    }

    #[must_use]
    pub const fn with_restart_base(mut self, restart_base: usize) -> Self {
        self.restart_base = restart_base;
        self
    }

    #[must_use]
    pub const fn with_learned_clause_limit(mut self, limit: usize) -> Self {
        self.learned_clause_limit = limit;
        self
    }

    #[must_use]
    pub const fn with_max_conflicts(mut self, max_conflicts: Option<usize>) -> Self {
        self.max_conflicts = max_conflicts;
        self
    }

    #[must_use]
    pub const fn with_max_decisions(mut self, max_decisions: Option<usize>) -> Self {
        self.max_decisions = max_decisions;
        self
    }

    #[must_use]
    pub const fn with_time_limit(mut self, time_limit: Option<Duration>) -> Self {
        self.time_limit = time_limit;
        self
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub const fn with_phase_noise(mut self, phase_noise: f64) -> Self {
        self.phase_noise = phase_noise;
        self
    }

    #[must_use]
    pub const fn with_record_decisions(mut self, record_decisions: bool) -> Self {
        self.record_decisions = record_decisions;
        self
    }
}

/// A total model: one signed DIMACS literal per variable, in variable order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct Solutions(Vec<i32>);

impl Solutions {
    /// Wraps literals given in variable order (`literals[i]` is about variable `i + 1`).
    #[must_use]
    pub fn new(literals: &[i32]) -> Self {
        debug_assert!(
            literals
                .iter()
                .enumerate()
                .all(|(i, l)| l.unsigned_abs() as usize == i + 1)
        );
        Self(literals.to_vec())
    }

    /// Builds the model from the values of variables `1, 2, ...` in order.
    ///
    /// # Panics
    ///
    /// If there are more than `i32::MAX` values.
    pub fn from_values<I: IntoIterator<Item = bool>>(values: I) -> Self {
        Self(
            values
                .into_iter()
                .enumerate()
                .map(|(i, value)| {
                    let var = i32::try_from(i + 1).expect("variable exceeds DIMACS range");
                    if value { var } else { -var }
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of `var`, `None` if the model does not cover it.
    #[must_use]
    pub fn value(&self, var: Variable) -> Option<bool> {
        let idx = (var as usize).checked_sub(1)?;
        self.0.get(idx).map(|&l| l > 0)
    }

    #[must_use]
    pub fn literal_value(&self, lit: Literal) -> Option<bool> {
        self.value(lit.variable()).map(|v| v == lit.polarity())
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.iter().copied()
    }
}

impl Display for Solutions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().join(" "))
    }
}

/// Verdict of a solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveResult {
    /// Satisfiable, with a model.
    Sat(Solutions),
    /// Unsatisfiable.
    Unsat,
    /// A resource limit was reached first.
    Unknown,
}

impl SolveResult {
    #[must_use]
    pub const fn is_sat(&self) -> bool {
        matches!(self, Self::Sat(_))
    }

    #[must_use]
    pub const fn is_unsat(&self) -> bool {
        matches!(self, Self::Unsat)
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    #[must_use]
    pub const fn solutions(&self) -> Option<&Solutions> {
        match self {
            Self::Sat(s) => Some(s),
            _ => None,
        }
    }

    /// Process exit code used by SAT competitions.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Sat(_) => 10,
            Self::Unsat => 20,
            Self::Unknown => 0,
        }
    }
}

impl Display for SolveResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sat(_) => write!(f, "SATISFIABLE"),
            Self::Unsat => write!(f, "UNSATISFIABLE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Counters collected during a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SolutionStats {
    pub conflicts: usize,
    pub decisions: usize,
    pub propagations: usize,
    pub restarts: usize,
    pub learnt_clauses: usize,
    pub removed_clauses: usize,
    pub backjumps: usize,
    /// Sum over all backjumps of the number of levels popped.
    pub total_backjump_distance: usize,
    pub max_backjump_distance: usize,
}

impl SolutionStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_backjump_distance(&self) -> f64 {
        if self.backjumps == 0 {
            0.0
        } else {
            self.total_backjump_distance as f64 / self.backjumps as f64
        }
    }
}

/// A SAT solver over a fixed formula.
pub trait Solver<C: SolverConfig = DefaultConfig> {
    /// Creates a solver with default options.
    fn new(cnf: Cnf) -> Self;

    /// Creates a solver with the given options.
    ///
    /// # Errors
    ///
    /// `SolverError::InvalidOption` if `options` fail validation.
    fn with_options(cnf: Cnf, options: SolverOptions) -> Result<Self>
    where
        Self: Sized;

    /// Runs the search.
    ///
    /// # Errors
    ///
    /// `SolverError::InvariantViolation` if the search state is found inconsistent.
    fn solve(&mut self) -> Result<SolveResult>;

    /// The current assignment as a model; unassigned variables read as false.
    fn solutions(&self) -> Solutions;

    fn stats(&self) -> SolutionStats;
}
