#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Restart schedules.
//!
//! A restart abandons the current search path and pops the trail back to level 0. Learnt
//! clauses, variable activities and saved phases all survive, so the solver resumes with
//! everything it has learned and usually picks a different branch.
//!
//! The driver reports every conflict through `Restarter::should_restart`; the schedule
//! answers `true` once enough conflicts have happened since the previous restart.
//!
//! This module provides:
//! - The `Restarter` trait.
//! - `Luby`: intervals follow the Luby sequence `1, 1, 2, 1, 1, 2, 4, 1, 1, 2, ...` scaled
//!   by `restart_base` conflicts. Within a constant factor of the best schedule for an
//!   unknown run-time distribution.
//! - `Geometric`: intervals start at `restart_base` and grow by half after each restart.
//! - `Fixed`: a restart every `restart_base` conflicts.
//! - `Never`: restarts disabled.

use crate::sat::solver::SolverOptions;
use clap::ValueEnum;
use std::fmt::{Debug, Display};

/// Growth factor of `Geometric` intervals.
const GEOMETRIC_FACTOR: f64 = 1.5;

/// Interface for restart schedules.
pub trait Restarter: Debug + Clone {
    /// Creates the schedule in its initial state.
    fn new(options: &SolverOptions) -> Self;

    /// Conflicts left before the next restart.
    fn restarts_in(&self) -> usize;

    /// Records one conflict.
    fn count_conflict(&mut self);

    /// Starts the next interval and counts the restart.
    fn restart(&mut self);

    /// Restarts performed so far.
    fn num_restarts(&self) -> usize;

    /// Records a conflict and reports whether the solver should restart now.
    ///
    /// When this returns `true` the next interval has already been scheduled.
    fn should_restart(&mut self) -> bool {
        self.count_conflict();
        if self.restarts_in() == 0 {
            self.restart();
            true
        } else {
            false
        }
    }
}

/// Restart intervals following the Luby sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Luby {
    base: usize,
    restarts: usize,
    restarts_in: usize,
}

impl Luby {
    /// The `x`-th element (0-based) of the Luby sequence.
    ///
    /// Finds the complete subsequence of length `2^k - 1` containing `x`, then descends into
    /// the copy of the shorter subsequence that holds it, until `x` is the last element.
    #[must_use]
    pub const fn luby(mut x: usize) -> usize {
        let mut size = 1;
        let mut seq = 0;
        while size < x + 1 {
            seq += 1;
            size = 2 * size + 1;
        }
        while size - 1 != x {
            size = (size - 1) >> 1;
            seq -= 1;
            x %= size;
        }
        1 << seq
    }

    const fn interval(&self) -> usize {
        Self::luby(self.restarts).saturating_mul(self.base)
    }
}

impl Restarter for Luby {
    fn new(options: &SolverOptions) -> Self {
        let mut luby = Self {
            base: options.restart_base,
            restarts: 0,
            restarts_in: 0,
        };
        luby.restarts_in = luby.interval();
        luby
    }

    fn restarts_in(&self) -> usize {
        self.restarts_in
    }

    fn count_conflict(&mut self) {
        self.restarts_in = self.restarts_in.saturating_sub(1);
    }

    fn restart(&mut self) {
        self.restarts += 1;
        self.restarts_in = self.interval();
    }

    fn num_restarts(&self) -> usize {
        self.restarts
    }
}

/// Intervals growing geometrically from `restart_base`.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometric {
    restarts: usize,
    restarts_in: usize,
    restarts_interval: f64,
}

impl Restarter for Geometric {
    #[allow(clippy::cast_precision_loss)]
    fn new(options: &SolverOptions) -> Self {
        Self {
            restarts: 0,
            restarts_in: options.restart_base,
            restarts_interval: options.restart_base as f64,
        }
    }

    fn restarts_in(&self) -> usize {
        self.restarts_in
    }

    fn count_conflict(&mut self) {
        self.restarts_in = self.restarts_in.saturating_sub(1);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn restart(&mut self) {
        self.restarts += 1;
        self.restarts_interval *= GEOMETRIC_FACTOR;
        self.restarts_in = self.restarts_interval.round() as usize;
    }

    fn num_restarts(&self) -> usize {
        self.restarts
    }
}

/// A restart every `restart_base` conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixed {
    restarts: usize,
    restarts_in: usize,
    restarts_interval: usize,
}

impl Restarter for Fixed {
    fn new(options: &SolverOptions) -> Self {
        Self {
            restarts: 0,
            restarts_in: options.restart_base,
            restarts_interval: options.restart_base,
        }
    }

    fn restarts_in(&self) -> usize {
        self.restarts_in
    }

    fn count_conflict(&mut self) {
        self.restarts_in = self.restarts_in.saturating_sub(1);
    }

    fn restart(&mut self) {
        self.restarts += 1;
        self.restarts_in = self.restarts_interval;
    }

    fn num_restarts(&self) -> usize {
        self.restarts
    }
}

/// Never restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Never;

impl Restarter for Never {
    fn new(_options: &SolverOptions) -> Self {
        Self
    }

    fn restarts_in(&self) -> usize {
        usize::MAX
    }

    fn count_conflict(&mut self) {}

    fn restart(&mut self) {}

    fn num_restarts(&self) -> usize {
        0
    }

    fn should_restart(&mut self) -> bool {
        false
    }
}

/// Runtime choice between the schedules.
#[derive(Debug, Clone)]
pub enum RestarterImpls {
    Luby(Luby),
    Geometric(Geometric),
    Fixed(Fixed),
    Never(Never),
}

impl Restarter for RestarterImpls {
    fn new(options: &SolverOptions) -> Self {
        Self::Luby(Luby::new(options))
    }

    fn restarts_in(&self) -> usize {
        match self {
            Self::Luby(r) => r.restarts_in(),
            Self::Geometric(r) => r.restarts_in(),
            Self::Fixed(r) => r.restarts_in(),
            Self::Never(r) => r.restarts_in(),
        }
    }

    fn count_conflict(&mut self) {
        match self {
            Self::Luby(r) => r.count_conflict(),
            Self::Geometric(r) => r.count_conflict(),
            Self::Fixed(r) => r.count_conflict(),
            Self::Never(r) => r.count_conflict(),
        }
    }

    fn restart(&mut self) {
        match self {
            Self::Luby(r) => r.restart(),
            Self::Geometric(r) => r.restart(),
            Self::Fixed(r) => r.restart(),
            Self::Never(r) => r.restart(),
        }
    }

    fn num_restarts(&self) -> usize {
        match self {
            Self::Luby(r) => r.num_restarts(),
            Self::Geometric(r) => r.num_restarts(),
            Self::Fixed(r) => r.num_restarts(),
            Self::Never(r) => r.num_restarts(),
        }
    }

    fn should_restart(&mut self) -> bool {
        match self {
            Self::Luby(r) => r.should_restart(),
            Self::Geometric(r) => r.should_restart(),
            Self::Fixed(r) => r.should_restart(),
            Self::Never(r) => r.should_restart(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum RestarterType {
    /// Luby sequence scaled by the restart base
    #[default]
    Luby,
    /// Interval grows by half after each restart
    Geometric,
    /// Constant interval
    Fixed,
    /// No restarts
    Never,
}

impl Display for RestarterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Luby => write!(f, "luby"),
            Self::Geometric => write!(f, "geometric"),
            Self::Fixed => write!(f, "fixed"),
            Self::Never => write!(f, "never"),
        }
    }
}

impl RestarterType {
    #[must_use]
    pub fn to_impl(self, options: &SolverOptions) -> RestarterImpls {
        match self {
            Self::Luby => RestarterImpls::Luby(Luby::new(options)),
            Self::Geometric => RestarterImpls::Geometric(Geometric::new(options)),
            Self::Fixed => RestarterImpls::Fixed(Fixed::new(options)),
            Self::Never => RestarterImpls::Never(Never),
        }
    }
}
