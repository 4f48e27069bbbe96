mod common;

use cdcl_sat::sat::cdcl::Cdcl;
use cdcl_sat::sat::clause_management::{
    ClauseManagementType, LbdClauseManagement, NoClauseManagement,
};
use cdcl_sat::sat::clause::LiteralStorage;
use cdcl_sat::sat::cnf::Cnf;
use cdcl_sat::sat::dimacs::parse_dimacs;
use cdcl_sat::sat::literal::Literal;
use cdcl_sat::sat::phase_saving::{PhaseSelectorType, SavedPhases};
use cdcl_sat::sat::propagation::{PropagatorType, WatchedLiterals};
use cdcl_sat::sat::restarter::{Fixed, Luby, RestarterType};
use cdcl_sat::sat::solver::{
    DefaultConfig, DynamicConfig, SolutionStats, SolveResult, Solutions, Solver, SolverConfig,
    SolverOptions,
};
use cdcl_sat::sat::trail::Reason;
use cdcl_sat::sat::variable_selection::{RandomOrder, VariableSelectionType};
use common::{brute_force_sat, pigeonhole, random_clauses};
use rustc_hash::FxHashSet;
use std::io::Cursor;

#[derive(Debug, Clone)]
struct RandomConfig;

impl SolverConfig for RandomConfig {
    type Propagator = WatchedLiterals;
    type VariableSelector = RandomOrder;
    type PhaseSelector = SavedPhases;
    type Restarter = Luby;
    type ClauseManager = LbdClauseManagement;
}

#[derive(Debug, Clone)]
struct KeepEverythingConfig;

impl SolverConfig for KeepEverythingConfig {
    type Propagator = WatchedLiterals;
    type VariableSelector = cdcl_sat::sat::variable_selection::Vsids;
    type PhaseSelector = SavedPhases;
    type Restarter = Fixed;
    type ClauseManager = NoClauseManagement;
}

fn solve(clauses: Vec<Vec<i32>>) -> (Cnf, SolveResult) {
    let cnf = Cnf::new(clauses).unwrap();
    let mut solver: Cdcl = Cdcl::new(cnf.clone());
    (cnf, solver.solve().unwrap())
}

/// Fifty variables: six holes for seven pigeons, plus unconstrained padding.
fn padded_pigeonhole() -> Cnf {
    let php = pigeonhole(6);
    assert_eq!(php.num_vars, 42);
    let clauses: Vec<Vec<i32>> = php
        .iter()
        .map(|c| c.iter().map(|l| l.to_i32()).collect())
        .collect();
    Cnf::with_num_vars(50, clauses).unwrap()
}

#[test]
fn test_single_unit_clause() {
    let (_, result) = solve(vec![vec![1]]);
    assert_eq!(result, SolveResult::Sat(Solutions::new(&[1])));
}

#[test]
fn test_complementary_units() {
    let (_, result) = solve(vec![vec![1], vec![-1]]);
    assert_eq!(result, SolveResult::Unsat);
}

#[test]
fn test_equal_and_different() {
    let (_, result) = solve(vec![vec![1, 2], vec![-1, 2], vec![1, -2], vec![-1, -2]]);
    assert_eq!(result, SolveResult::Unsat);
}

#[test]
fn test_chain_is_satisfiable() {
    let (cnf, result) = solve(vec![vec![1, 2, 3], vec![-1, 2], vec![-2, 3]]);
    let model = result.solutions().expect("expected SAT");
    assert_eq!(model.len(), 3);
    assert!(cnf.verify(model));
}

#[test]
fn test_pigeonhole_is_unsat() {
    let cnf = padded_pigeonhole();
    let mut solver: Cdcl = Cdcl::new(cnf);
    assert_eq!(solver.solve().unwrap(), SolveResult::Unsat);
    let stats = solver.stats();
    assert!(stats.conflicts > 0);
    assert!(stats.conflicts < SolverOptions::default().max_conflicts.unwrap());
}

#[test]
fn test_pigeonhole_with_one_conflict_is_unknown() {
    let cnf = padded_pigeonhole();
    let options = SolverOptions::default().with_max_conflicts(Some(1));
    let mut solver: Cdcl = Cdcl::with_options(cnf, options).unwrap();
    assert_eq!(solver.solve().unwrap(), SolveResult::Unknown);
    assert!(solver.stats().conflicts >= 1);
}

#[test]
fn test_time_limit_zero_is_unknown() {
    let cnf = padded_pigeonhole();
    let options = SolverOptions::default().with_time_limit(Some(std::time::Duration::ZERO));
    let mut solver: Cdcl = Cdcl::with_options(cnf, options).unwrap();
    assert_eq!(solver.solve().unwrap(), SolveResult::Unknown);
}

#[test]
fn test_same_seed_same_decisions() {
    let clauses = random_clauses(40, 170, 3, 11);
    let options = SolverOptions::default()
        .with_seed(42)
        .with_phase_noise(0.2)
        .with_record_decisions(true);

    let run = || {
        let cnf = Cnf::new(clauses.clone()).unwrap();
        let mut solver: Cdcl<RandomConfig> =
            Cdcl::with_options(cnf, options.clone()).unwrap();
        let result = solver.solve().unwrap();
        (result, solver.decisions().to_vec())
    };

    let (first_result, first_decisions) = run();
    let (second_result, second_decisions) = run();
    assert_eq!(first_result, second_result);
    assert!(!first_decisions.is_empty());
    assert_eq!(first_decisions, second_decisions);
}

#[test]
fn test_trail_consistent_after_solve() {
    for seed in 0..20 {
        let clauses = random_clauses(30, 120, 3, seed);
        let cnf = Cnf::new(clauses).unwrap();
        let mut solver: Cdcl = Cdcl::new(cnf);
        let result = solver.solve().unwrap();
        assert!(solver.trail.levels_are_consistent(), "seed {seed}");

        if !result.is_sat() {
            continue;
        }
        assert_eq!(solver.trail.len(), solver.cnf.num_vars);
        for i in 0..solver.trail.len() {
            let step = &solver.trail[i];
            let Reason::Clause(idx) = step.reason else {
                continue;
            };
            let clause = &solver.cnf[idx];
            assert!(clause.iter().any(|&l| l == step.lit), "seed {seed}");
            for &other in clause.iter().filter(|&&l| l != step.lit) {
                assert_eq!(
                    solver.assignment.literal_value(other),
                    Some(false),
                    "seed {seed}"
                );
                assert!(
                    solver.trail.position(other.variable()) < i,
                    "seed {seed}"
                );
            }
        }
    }
}

/// Learnt clauses of `cnf`, each as its sorted literals.
fn learnt_keys(cnf: &Cnf) -> FxHashSet<LiteralStorage> {
    cnf.learnt_clauses().map(|(_, c)| c.sorted_key()).collect()
}

#[test]
fn test_counters_grow_with_budget() {
    let mut previous: Option<(SolutionStats, FxHashSet<LiteralStorage>)> = None;
    for max_conflicts in [5, 20, 80, 320] {
        let options = SolverOptions::default()
            .with_max_conflicts(Some(max_conflicts))
            .with_restart_base(3);
        let mut solver: Cdcl<KeepEverythingConfig> =
            Cdcl::with_options(pigeonhole(7), options).unwrap();
        assert_eq!(solver.solve().unwrap(), SolveResult::Unknown);

        let stats = solver.stats();
        let learnt = learnt_keys(&solver.cnf);
        assert!(stats.conflicts >= max_conflicts);
        assert_eq!(stats.removed_clauses, 0);
        assert!(!learnt.is_empty());
        // Stored learnt clauses are never duplicated.
        assert_eq!(learnt.len(), solver.cnf.num_learnt());

        if let Some((prev_stats, prev_learnt)) = &previous {
            assert!(stats.conflicts > prev_stats.conflicts);
            assert!(stats.learnt_clauses >= prev_stats.learnt_clauses);
            assert!(stats.restarts >= prev_stats.restarts);
            assert!(stats.decisions >= prev_stats.decisions);
            // A longer run replays the shorter one, so every clause learnt there (and kept
            // through its restarts) must still be stored here.
            assert!(prev_learnt.is_subset(&learnt));
        }
        previous = Some((stats, learnt));
    }
    let (stats, _) = previous.unwrap();
    assert!(stats.restarts > 0);
}

#[test]
fn test_restart_keeps_learnt_clauses() {
    let options = SolverOptions::default()
        .with_max_conflicts(Some(60))
        .with_restart_base(1);
    let mut solver: Cdcl<KeepEverythingConfig> =
        Cdcl::with_options(pigeonhole(7), options).unwrap();
    assert_eq!(solver.solve().unwrap(), SolveResult::Unknown);

    let stats = solver.stats();
    // With a restart after every conflict, each learnt clause outlived at least one restart.
    assert!(stats.restarts >= 50);
    assert!(solver.cnf.num_learnt() > stats.restarts / 2);
    assert_eq!(learnt_keys(&solver.cnf).len(), solver.cnf.num_learnt());
}

#[test]
fn test_small_clause_limit_prunes_and_stays_correct() {
    let options = SolverOptions::default().with_learned_clause_limit(20);
    let mut solver: Cdcl = Cdcl::with_options(pigeonhole(5), options).unwrap();
    assert_eq!(solver.solve().unwrap(), SolveResult::Unsat);
    assert!(solver.stats().removed_clauses > 0);
}

#[test]
fn test_agrees_with_truth_table() {
    let mut sat = 0;
    let mut unsat = 0;
    for seed in 0..150 {
        let num_vars = 8;
        let clauses = random_clauses(num_vars, 36, 3, seed);
        let expected = brute_force_sat(num_vars as usize, &clauses);

        let cnf = Cnf::with_num_vars(num_vars as usize, clauses).unwrap();
        let mut solver: Cdcl = Cdcl::new(cnf.clone());
        let result = solver.solve().unwrap();
        assert_eq!(result.is_sat(), expected, "seed {seed}");
        match result {
            SolveResult::Sat(model) => {
                assert!(cnf.verify(&model), "seed {seed}");
                sat += 1;
            }
            SolveResult::Unsat => unsat += 1,
            SolveResult::Unknown => panic!("seed {seed}: unexpected UNKNOWN"),
        }
    }
    assert!(sat > 0 && unsat > 0);
}

#[test]
fn test_every_strategy_combination() {
    let instances: Vec<(Vec<Vec<i32>>, bool)> = (0..6)
        .map(|seed| {
            let clauses = random_clauses(10, 43, 3, 100 + seed);
            let expected = brute_force_sat(10, &clauses);
            (clauses, expected)
        })
        .collect();

    for propagator in [PropagatorType::WatchedLiterals, PropagatorType::UnitSearch] {
        for selection in [
            VariableSelectionType::Vsids,
            VariableSelectionType::FixedOrder,
            VariableSelectionType::RandomOrder,
        ] {
            for phase in [PhaseSelectorType::SavedPhases, PhaseSelectorType::FixedPhase] {
                for restart in [
                    RestarterType::Luby,
                    RestarterType::Geometric,
                    RestarterType::Fixed,
                    RestarterType::Never,
                ] {
                    for management in [
                        ClauseManagementType::LbdClauseManagement,
                        ClauseManagementType::NoClauseManagement,
                    ] {
                        for (clauses, expected) in &instances {
                            let cnf = Cnf::with_num_vars(10, clauses.clone()).unwrap();
                            let options = SolverOptions::default()
                                .with_restart_base(2)
                                .with_learned_clause_limit(4)
                                .with_phase_noise(0.1)
                                .with_seed(3);
                            let mut solver = Cdcl::<DynamicConfig>::from_parts(
                                cnf.clone(),
                                options.clone(),
                                propagator.to_impl(&cnf),
                                selection.to_impl(cnf.num_vars, &options),
                                phase.to_impl(cnf.num_vars, &options),
                                restart.to_impl(&options),
                                management.to_impl(&cnf, &options),
                            )
                            .unwrap();
                            let result = solver.solve().unwrap();
                            assert_eq!(
                                result.is_sat(),
                                *expected,
                                "{propagator} {selection} {phase} {restart} {management}"
                            );
                            if let Some(model) = result.solutions() {
                                assert!(cnf.verify(model));
                            }
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn test_dimacs_to_verdict() {
    let text = "c example\np cnf 4 4\n1 2 0\n-1 3 0\n-3 -2 0\n4 0\n";
    let cnf = parse_dimacs(Cursor::new(text)).unwrap();
    let mut solver: Cdcl = Cdcl::new(cnf.clone());
    let result = solver.solve().unwrap();
    let model = result.solutions().unwrap();
    assert!(cnf.verify(model));
    assert_eq!(model.literal_value(Literal::from_i32(4).unwrap()), Some(true));
    assert_eq!(result.exit_code(), 10);
}

#[test]
fn test_independent_solvers_coexist() {
    let mut a: Cdcl<DefaultConfig> = Cdcl::new(pigeonhole(3));
    let mut b: Cdcl<DefaultConfig> = Cdcl::new(Cnf::new(vec![vec![1, 2], vec![-1]]).unwrap());
    assert_eq!(b.solve().unwrap(), SolveResult::Sat(Solutions::new(&[-1, 2])));
    assert_eq!(a.solve().unwrap(), SolveResult::Unsat);
    assert_eq!(a.solve().unwrap().exit_code(), 20);
}
