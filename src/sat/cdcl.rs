#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! The CDCL driver.
//!
//! The search is an explicit state machine over `Propagate`, `Conflict` and `Decide`:
//! - `Propagate` runs unit propagation. A falsified clause moves to `Conflict`; a fixpoint
//!   with every variable assigned is a model; otherwise the driver moves to `Decide`.
//! - `Conflict` derives a 1UIP clause, backjumps to the level where it becomes unit,
//!   stores it and asserts its first literal with the clause as reason. Conflicts at level 0
//!   prove the formula unsatisfiable. Afterwards the clause database may be reduced and the
//!   restart schedule may pop the trail back to level 0.
//! - `Decide` first checks the resource limits, then picks a variable and a polarity and
//!   opens a new decision level.
//!
//! Unit clauses of the input are asserted at level 0 before the first propagation.

use crate::sat::assignment::Assignment;
use crate::sat::clause::Clause;
use crate::sat::clause_management::ClauseManagement;
use crate::sat::cnf::{Cnf, DecisionLevel};
use crate::sat::conflict_analysis::{Analyser, Conflict};
use crate::sat::error::{Result, SolverError};
use crate::sat::literal::Literal;
use crate::sat::phase_saving::PhaseSelector;
use crate::sat::propagation::Propagator;
use crate::sat::restarter::Restarter;
use crate::sat::solver::{
    DefaultConfig, SolutionStats, Solutions, SolveResult, Solver, SolverConfig, SolverOptions,
};
use crate::sat::trail::{Reason, Trail};
use crate::sat::variable_selection::VariableSelection;
use smallvec::smallvec;
use std::time::Instant;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Propagate,
    Conflict(usize),
    Decide,
}

/// Owned search state of one CDCL solve.
#[derive(Debug, Clone)]
pub struct Cdcl<Config: SolverConfig = DefaultConfig> {
    pub cnf: Cnf,
    pub trail: Trail,
    pub assignment: Assignment,
    pub propagator: Config::Propagator,
    pub selector: Config::VariableSelector,
    pub phases: Config::PhaseSelector,
    pub restarter: Config::Restarter,
    pub manager: Config::ClauseManager,
    analyser: Analyser,
    options: SolverOptions,
    stats: SolutionStats,
    decisions: Vec<Literal>,
    result: Option<SolveResult>,
}

impl<Config: SolverConfig> Cdcl<Config> {
    /// Assembles a solver from already constructed strategies.
    ///
    /// # Errors
    ///
    /// `SolverError::InvalidOption` if `options` fail validation.
    pub fn from_parts(
        cnf: Cnf,
        options: SolverOptions,
        propagator: Config::Propagator,
        selector: Config::VariableSelector,
        phases: Config::PhaseSelector,
        restarter: Config::Restarter,
        manager: Config::ClauseManager,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            trail: Trail::new(cnf.num_vars),
            assignment: Assignment::new(cnf.num_vars),
            analyser: Analyser::new(cnf.num_vars),
            cnf,
            propagator,
            selector,
            phases,
            restarter,
            manager,
            options,
            stats: SolutionStats::default(),
            decisions: Vec::new(),
            result: None,
        })
    }

    /// Builds every strategy from `options`, which must already be valid.
    fn build(cnf: Cnf, options: SolverOptions) -> Self {
        Self {
            propagator: Config::Propagator::new(&cnf),
            selector: Config::VariableSelector::new(cnf.num_vars, &options),
            phases: Config::PhaseSelector::new(cnf.num_vars, &options),
            restarter: Config::Restarter::new(&options),
            manager: Config::ClauseManager::new(&cnf, &options),
            trail: Trail::new(cnf.num_vars),
            assignment: Assignment::new(cnf.num_vars),
            analyser: Analyser::new(cnf.num_vars),
            cnf,
            options,
            stats: SolutionStats::default(),
            decisions: Vec::new(),
            result: None,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Decisions made so far, in order. Only kept with `record_decisions`.
    #[must_use]
    pub fn decisions(&self) -> &[Literal] {
        &self.decisions
    }

    /// Asserts the input unit clauses at level 0. Returns `false` if two of them clash.
    fn assert_root_units(&mut self) -> bool {
        for idx in 0..self.cnf.non_learnt_idx {
            let clause = &self.cnf[idx];
            if !clause.is_unit() {
                continue;
            }
            let lit = clause[0];
            match self.assignment.literal_value(lit) {
                Some(true) => {}
                Some(false) => return false,
                None => self
                    .trail
                    .push(&mut self.assignment, lit, Reason::Clause(idx)),
            }
        }
        true
    }

    fn limit_reached(&self, started: Instant) -> bool {
        let stats = &self.stats;
        self.options
            .max_conflicts
            .is_some_and(|max| stats.conflicts >= max)
            || self
                .options
                .max_decisions
                .is_some_and(|max| stats.decisions >= max)
            || self
                .options
                .time_limit
                .is_some_and(|limit| started.elapsed() >= limit)
    }

    fn decide(&mut self) -> Result<()> {
        let var = self.selector.pick(&self.assignment).ok_or_else(|| {
            SolverError::InvariantViolation(
                "no variable to decide on a partial assignment".to_string(),
            )
        })?;
        let lit = Literal::new(var, self.phases.get_next(var));

        self.stats.decisions += 1;
        if self.options.record_decisions {
            self.decisions.push(lit);
        }
        trace!(%lit, level = self.trail.decision_level() + 1, "decide");
        self.trail.push_decision(&mut self.assignment, lit);
        Ok(())
    }

    /// Pops the trail to `level`, saving phases and handing variables back to the selector.
    fn backtrack(&mut self, level: DecisionLevel) -> Result<()> {
        let phases = &mut self.phases;
        let selector = &mut self.selector;
        self.trail
            .backtrack_to(&mut self.assignment, level, |lit| {
                phases.save(lit);
                selector.on_unassign(lit.variable());
            })?;
        debug_assert!(self.trail.levels_are_consistent());
        Ok(())
    }

    fn backjump(&mut self, level: DecisionLevel) -> Result<()> {
        let distance = self.trail.decision_level().saturating_sub(level);
        self.stats.backjumps += 1;
        self.stats.total_backjump_distance += distance;
        self.stats.max_backjump_distance = self.stats.max_backjump_distance.max(distance);
        trace!(from = self.trail.decision_level(), to = level, "backjump");
        self.backtrack(level)
    }

    /// Learns from the conflict on `c_ref`. Returns `false` if the formula is unsatisfiable.
    fn resolve_conflict(&mut self, c_ref: usize) -> Result<bool> {
        self.stats.conflicts += 1;

        let conflict = self.analyser.analyse(&self.cnf, &self.trail, c_ref)?;
        let (clause, level) = match conflict {
            Conflict::Ground => return Ok(false),
            Conflict::Unit(lit) => {
                debug!(%lit, conflicts = self.stats.conflicts, "learnt unit");
                (Clause::learnt(smallvec![lit], 1), 0)
            }
            Conflict::Learned {
                clause,
                backjump_level,
            } => (clause, backjump_level),
        };

        self.manager
            .bump_involved_clause_activities(&mut self.cnf, &self.analyser.resolved);
        self.selector
            .bumps(self.analyser.involved_variables().iter().copied());
        self.selector.decay();

        self.backjump(level)?;

        let asserting = clause[0];
        if self.assignment.literal_value(asserting).is_some() {
            return Err(SolverError::InvariantViolation(format!(
                "asserting literal {asserting} is assigned after backjumping to level {level}"
            )));
        }
        let idx = self
            .manager
            .add_learnt(&mut self.cnf, &mut self.propagator, clause);
        self.stats.learnt_clauses += 1;
        self.trail
            .push(&mut self.assignment, asserting, Reason::Clause(idx));

        self.manager.on_conflict(&mut self.cnf);
        if self.manager.should_clean_db(&self.cnf) {
            self.manager
                .clean_clause_db(&mut self.cnf, &mut self.trail, &mut self.propagator);
        }

        if self.restarter.should_restart() {
            debug!(
                restarts = self.restarter.num_restarts(),
                conflicts = self.stats.conflicts,
                "restart"
            );
            self.backtrack(0)?;
        }
        Ok(true)
    }

    fn search(&mut self, started: Instant) -> Result<SolveResult> {
        if self.cnf.has_empty_clause() {
            return Ok(SolveResult::Unsat);
        }
        if self.cnf.is_empty() {
            return Ok(SolveResult::Sat(Solutions::from_values(
                std::iter::repeat_n(true, self.cnf.num_vars),
            )));
        }
        if !self.assert_root_units() {
            return Ok(SolveResult::Unsat);
        }

        let mut state = State::Propagate;
        loop {
            state = match state {
                State::Propagate => {
                    match self.propagator.propagate(
                        &mut self.trail,
                        &mut self.assignment,
                        &mut self.cnf,
                    ) {
                        Some(c_ref) => State::Conflict(c_ref),
                        None if self.assignment.all_assigned() => {
                            let solutions = self.assignment.get_solutions();
                            debug_assert!(self.cnf.verify(&solutions));
                            return Ok(SolveResult::Sat(solutions));
                        }
                        None => State::Decide,
                    }
                }
                State::Conflict(c_ref) => {
                    if !self.resolve_conflict(c_ref)? {
                        return Ok(SolveResult::Unsat);
                    }
                    State::Propagate
                }
                State::Decide => {
                    if self.limit_reached(started) {
                        return Ok(SolveResult::Unknown);
                    }
                    self.decide()?;
                    State::Propagate
                }
            };
        }
    }
}

impl<Config: SolverConfig> Solver<Config> for Cdcl<Config> {
    fn new(cnf: Cnf) -> Self {
        Self::build(cnf, SolverOptions::default())
    }

    fn with_options(cnf: Cnf, options: SolverOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(cnf, options))
    }

    fn solve(&mut self) -> Result<SolveResult> {
        if let Some(result) = &self.result {
            return Ok(result.clone());
        }

        let started = Instant::now();
        let result = self.search(started)?;
        let stats = self.stats();
        info!(
            result = %result,
            conflicts = stats.conflicts,
            decisions = stats.decisions,
            propagations = stats.propagations,
            restarts = stats.restarts,
            elapsed_ms = started.elapsed().as_millis(),
            "solve finished"
        );
        self.result = Some(result.clone());
        Ok(result)
    }

    fn solutions(&self) -> Solutions {
        self.assignment.get_solutions()
    }

    fn stats(&self) -> SolutionStats {
        SolutionStats {
            propagations: self.propagator.num_propagations(),
            restarts: self.restarter.num_restarts(),
            removed_clauses: self.manager.num_removed(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::clause_management::ClauseManagementType;
    use crate::sat::phase_saving::PhaseSelectorType;
    use crate::sat::propagation::PropagatorType;
    use crate::sat::restarter::RestarterType;
    use crate::sat::solver::DynamicConfig;
    use crate::sat::variable_selection::VariableSelectionType;

    fn solve(clauses: Vec<Vec<i32>>) -> (Cnf, SolveResult) {
        let cnf = Cnf::new(clauses).unwrap();
        let mut solver: Cdcl = Cdcl::new(cnf.clone());
        let result = solver.solve().unwrap();
        (cnf, result)
    }

    #[test]
    fn test_single_unit_clause() {
        let (_, result) = solve(vec![vec![1]]);
        assert_eq!(result, SolveResult::Sat(Solutions::new(&[1])));
    }

    #[test]
    fn test_contradictory_units() {
        let (_, result) = solve(vec![vec![1], vec![-1]]);
        assert_eq!(result, SolveResult::Unsat);
    }

    #[test]
    fn test_all_four_binary_clauses_unsat() {
        let (_, result) = solve(vec![vec![1, 2], vec![-1, 2], vec![1, -2], vec![-1, -2]]);
        assert_eq!(result, SolveResult::Unsat);
    }

    #[test]
    fn test_small_sat_instance() {
        let (cnf, result) = solve(vec![vec![1, 2, 3], vec![-1, 2], vec![-2, 3]]);
        let model = result.solutions().expect("expected SAT");
        assert!(cnf.verify(model));
    }

    #[test]
    fn test_empty_clause_is_unsat_without_search() {
        let cnf = Cnf::new(vec![vec![1, 2], vec![]]).unwrap();
        let mut solver: Cdcl = Cdcl::new(cnf);
        assert_eq!(solver.solve().unwrap(), SolveResult::Unsat);
        assert_eq!(solver.stats().decisions, 0);
    }

    #[test]
    fn test_empty_formula_assigns_everything_true() {
        let cnf = Cnf::with_num_vars(3, Vec::<Vec<i32>>::new()).unwrap();
        let mut solver: Cdcl = Cdcl::new(cnf);
        assert_eq!(
            solver.solve().unwrap(),
            SolveResult::Sat(Solutions::new(&[1, 2, 3]))
        );
    }

    #[test]
    fn test_unused_declared_variables_get_values() {
        let cnf = Cnf::with_num_vars(4, vec![vec![-2]]).unwrap();
        let mut solver: Cdcl = Cdcl::new(cnf);
        let result = solver.solve().unwrap();
        let model = result.solutions().unwrap();
        assert_eq!(model.len(), 4);
        assert_eq!(model.value(2), Some(false));
    }

    #[test]
    fn test_conflicts_learn_and_backjump() {
        // Every assignment of 1..=3 violates some clause.
        let clauses = vec![
            vec![1, 2, 3],
            vec![1, 2, -3],
            vec![1, -2, 3],
            vec![1, -2, -3],
            vec![-1, 2, 3],
            vec![-1, 2, -3],
            vec![-1, -2, 3],
            vec![-1, -2, -3],
        ];
        let cnf = Cnf::new(clauses).unwrap();
        let mut solver: Cdcl = Cdcl::new(cnf);
        assert_eq!(solver.solve().unwrap(), SolveResult::Unsat);

        let stats = solver.stats();
        assert!(stats.conflicts > 0);
        assert!(stats.learnt_clauses > 0);
        assert!(stats.decisions > 0);
        assert_eq!(stats.backjumps, stats.learnt_clauses);
        assert!(stats.max_backjump_distance >= 1);
    }

    #[test]
    fn test_decision_limit_gives_unknown() {
        let cnf = Cnf::new(vec![vec![1, 2], vec![-1, 3]]).unwrap();
        let opts = SolverOptions::default().with_max_decisions(Some(0));
        let mut solver: Cdcl = Cdcl::with_options(cnf, opts).unwrap();
        assert_eq!(solver.solve().unwrap(), SolveResult::Unknown);
    }

    #[test]
    fn test_propagation_alone_ignores_limits() {
        let cnf = Cnf::new(vec![vec![1], vec![-1, 2]]).unwrap();
        let opts = SolverOptions::default().with_max_conflicts(Some(0));
        let mut solver: Cdcl = Cdcl::with_options(cnf, opts).unwrap();
        assert_eq!(
            solver.solve().unwrap(),
            SolveResult::Sat(Solutions::new(&[1, 2]))
        );
    }

    #[test]
    fn test_invalid_options_rejected() {
        let cnf = Cnf::new(vec![vec![1]]).unwrap();
        let opts = SolverOptions::default().with_vsids_decay(2.0);
        assert!(matches!(
            Cdcl::<DefaultConfig>::with_options(cnf, opts),
            Err(SolverError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_recorded_decisions() {
        let cnf = Cnf::new(vec![vec![1, 2], vec![-2, 3]]).unwrap();
        let opts = SolverOptions::default().with_record_decisions(true);
        let mut solver: Cdcl = Cdcl::with_options(cnf, opts).unwrap();
        assert!(solver.solve().unwrap().is_sat());
        assert_eq!(solver.decisions().len(), solver.stats().decisions);
        assert_eq!(solver.decisions()[0], Literal::new(1, true));
    }

    #[test]
    fn test_solve_twice_returns_same_result() {
        let cnf = Cnf::new(vec![vec![1, 2], vec![-1]]).unwrap();
        let mut solver: Cdcl = Cdcl::new(cnf);
        let first = solver.solve().unwrap();
        let second = solver.solve().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_dynamic_config_from_parts() {
        let cnf = Cnf::new(vec![
            vec![1, 2, 3],
            vec![-1, -2],
            vec![-2, -3],
            vec![-1, -3],
            vec![1, -2],
        ])
        .unwrap();
        let opts = SolverOptions::default().with_seed(7);
        let mut solver = Cdcl::<DynamicConfig>::from_parts(
            cnf.clone(),
            opts.clone(),
            PropagatorType::UnitSearch.to_impl(&cnf),
            VariableSelectionType::RandomOrder.to_impl(cnf.num_vars, &opts),
            PhaseSelectorType::FixedPhase.to_impl(cnf.num_vars, &opts),
            RestarterType::Fixed.to_impl(&opts),
            ClauseManagementType::NoClauseManagement.to_impl(&cnf, &opts),
        )
        .unwrap();
        let result = solver.solve().unwrap();
        assert!(cnf.verify(result.solutions().expect("expected SAT")));
    }
}
