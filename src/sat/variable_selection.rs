#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Branching heuristics: which unassigned variable to decide next.

use crate::sat::assignment::Assignment;
use crate::sat::literal::Variable;
use crate::sat::solver::SolverOptions;
use clap::ValueEnum;
use fastrand::Rng;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt::{Debug, Display};

const RESCALE_LIMIT: f64 = 1e100;
const RESCALE_FACTOR: f64 = 1e-100;

pub trait VariableSelection: Debug + Clone {
    fn new(num_vars: usize, options: &SolverOptions) -> Self;

    /// Next variable to branch on, or `None` if every variable is assigned.
    fn pick(&mut self, assignment: &Assignment) -> Option<Variable>;

    /// Rewards variables that took part in a conflict.
    fn bumps<T: IntoIterator<Item = Variable>>(&mut self, vars: T);

    /// Called once per conflict, after bumping.
    fn decay(&mut self);

    /// Called for every variable unassigned by a backjump or restart.
    fn on_unassign(&mut self, var: Variable);
}

/// Variable State Independent Decaying Sum.
///
/// Bumps add the current increment to a variable's activity; decaying grows the increment
/// instead of shrinking every activity, so recent conflicts weigh more. Activities and
/// increment are rescaled together before they overflow.
///
/// The heap is lazy: a bump pushes a fresh entry and leaves the old one behind. Entries
/// whose activity no longer matches, or whose variable is assigned, are discarded when
/// they reach the top.
#[derive(Debug, Clone)]
pub struct Vsids {
    activity: Vec<f64>,
    increment: f64,
    decay: f64,
    heap: BinaryHeap<(OrderedFloat<f64>, Reverse<Variable>)>,
}

impl Vsids {
    #[must_use]
    pub fn activity(&self, var: Variable) -> f64 {
        self.activity[var as usize]
    }

    #[must_use]
    pub const fn increment(&self) -> f64 {
        self.increment
    }

    fn push(&mut self, var: Variable) {
        self.heap
            .push((OrderedFloat(self.activity[var as usize]), Reverse(var)));
    }

    fn rebuild_heap(&mut self) {
        self.heap = self
            .activity
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(v, &a)| Variable::try_from(v).ok().map(|v| (OrderedFloat(a), Reverse(v))))
            .collect();
    }

    fn rescale(&mut self) {
        for a in &mut self.activity {
            *a *= RESCALE_FACTOR;
        }
        self.increment *= RESCALE_FACTOR;
        self.rebuild_heap();
    }
}

impl VariableSelection for Vsids {
    fn new(num_vars: usize, options: &SolverOptions) -> Self {
        let mut vsids = Self {
            activity: vec![0.0; num_vars + 1],
            increment: 1.0,
            decay: options.vsids_decay,
            heap: BinaryHeap::with_capacity(num_vars),
        };
        vsids.rebuild_heap();
        vsids
    }

    fn pick(&mut self, assignment: &Assignment) -> Option<Variable> {
        // Stale entries pile up between rebuilds; bound them.
        if self.heap.len() > 4 * self.activity.len() + 64 {
            self.rebuild_heap();
        }

        while let Some((act, Reverse(var))) = self.heap.pop() {
            if assignment.is_assigned(var) || act != OrderedFloat(self.activity[var as usize]) {
                continue;
            }
            return Some(var);
        }
        None
    }

    fn bumps<T: IntoIterator<Item = Variable>>(&mut self, vars: T) {
        let mut overflow = false;
        for var in vars {
            let a = &mut self.activity[var as usize];
            *a += self.increment;
            overflow |= *a > RESCALE_LIMIT;
            self.push(var);
        }
        if overflow {
            self.rescale();
        }
    }

    fn decay(&mut self) {
        self.increment /= self.decay;
        if self.increment > RESCALE_LIMIT {
            self.rescale();
        }
    }

    fn on_unassign(&mut self, var: Variable) {
        self.push(var);
    }
}

/// Always the smallest unassigned variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedOrder;

impl VariableSelection for FixedOrder {
    fn new(_num_vars: usize, _options: &SolverOptions) -> Self {
        Self
    }

    fn pick(&mut self, assignment: &Assignment) -> Option<Variable> {
        assignment.unassigned().next()
    }

    fn bumps<T: IntoIterator<Item = Variable>>(&mut self, _vars: T) {}

    fn decay(&mut self) {}

    fn on_unassign(&mut self, _var: Variable) {}
}

/// A uniformly random unassigned variable, drawn from a seeded generator.
#[derive(Debug, Clone)]
pub struct RandomOrder {
    rng: Rng,
    candidates: Vec<Variable>,
}

impl VariableSelection for RandomOrder {
    fn new(num_vars: usize, options: &SolverOptions) -> Self {
        Self {
            rng: Rng::with_seed(options.seed),
            candidates: Vec::with_capacity(num_vars),
        }
    }

    fn pick(&mut self, assignment: &Assignment) -> Option<Variable> {
        self.candidates.clear();
        self.candidates.extend(assignment.unassigned());
        if self.candidates.is_empty() {
            return None;
        }
        Some(self.candidates[self.rng.usize(..self.candidates.len())])
    }

    fn bumps<T: IntoIterator<Item = Variable>>(&mut self, _vars: T) {}

    fn decay(&mut self) {}

    fn on_unassign(&mut self, _var: Variable) {}
}

#[derive(Debug, Clone)]
pub enum VariableSelectionImpls {
    Vsids(Vsids),
    FixedOrder(FixedOrder),
    RandomOrder(RandomOrder),
}

impl VariableSelection for VariableSelectionImpls {
    fn new(num_vars: usize, options: &SolverOptions) -> Self {
        Self::Vsids(Vsids::new(num_vars, options))
    }

    fn pick(&mut self, assignment: &Assignment) -> Option<Variable> {
        match self {
            Self::Vsids(s) => s.pick(assignment),
            Self::FixedOrder(s) => s.pick(assignment),
            Self::RandomOrder(s) => s.pick(assignment),
        }
    }

    fn bumps<T: IntoIterator<Item = Variable>>(&mut self, vars: T) {
        match self {
            Self::Vsids(s) => s.bumps(vars),
            Self::FixedOrder(s) => s.bumps(vars),
            Self::RandomOrder(s) => s.bumps(vars),
        }
    }

    fn decay(&mut self) {
        match self {
            Self::Vsids(s) => s.decay(),
            Self::FixedOrder(s) => s.decay(),
            Self::RandomOrder(s) => s.decay(),
        }
    }

    fn on_unassign(&mut self, var: Variable) {
        match self {
            Self::Vsids(s) => s.on_unassign(var),
            Self::FixedOrder(s) => s.on_unassign(var),
            Self::RandomOrder(s) => s.on_unassign(var),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum VariableSelectionType {
    /// Highest activity first
    #[default]
    Vsids,
    /// Smallest variable first
    FixedOrder,
    /// Seeded random choice
    RandomOrder,
}

impl Display for VariableSelectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vsids => write!(f, "vsids"),
            Self::FixedOrder => write!(f, "fixed-order"),
            Self::RandomOrder => write!(f, "random-order"),
        }
    }
}

impl VariableSelectionType {
    #[must_use]
    pub fn to_impl(self, num_vars: usize, options: &SolverOptions) -> VariableSelectionImpls {
        match self {
            Self::Vsids => VariableSelectionImpls::Vsids(Vsids::new(num_vars, options)),
            Self::FixedOrder => {
                VariableSelectionImpls::FixedOrder(FixedOrder::new(num_vars, options))
            }
            Self::RandomOrder => {
                VariableSelectionImpls::RandomOrder(RandomOrder::new(num_vars, options))
            }
        }
    }
}
