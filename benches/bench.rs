use cdcl_sat::sat::cdcl::Cdcl;
use cdcl_sat::sat::clause_management::{
    ClauseManagement, LbdClauseManagement, NoClauseManagement,
};
use cdcl_sat::sat::cnf::Cnf;
use cdcl_sat::sat::phase_saving::{FixedPhase, PhaseSelector, SavedPhases};
use cdcl_sat::sat::propagation::{Propagator, UnitSearch, WatchedLiterals};
use cdcl_sat::sat::restarter::{Fixed, Geometric, Luby, Never, Restarter};
use cdcl_sat::sat::solver::{Solver, SolverConfig};
use cdcl_sat::sat::variable_selection::{FixedOrder, RandomOrder, VariableSelection, Vsids};
use criterion::{Criterion, criterion_group, criterion_main};
use std::fmt::Debug;
use std::hint::black_box;
use std::marker::PhantomData;
use std::time::Duration;

#[derive(Debug, Clone)]
struct SelectorConfig<V: VariableSelection>(PhantomData<V>);

impl<V: VariableSelection> SolverConfig for SelectorConfig<V> {
    type Propagator = WatchedLiterals;
    type VariableSelector = V;
    type PhaseSelector = SavedPhases;
    type Restarter = Luby;
    type ClauseManager = LbdClauseManagement;
}

#[derive(Debug, Clone)]
struct RestarterConfig<R: Restarter>(PhantomData<R>);

impl<R: Restarter> SolverConfig for RestarterConfig<R> {
    type Propagator = WatchedLiterals;
    type VariableSelector = Vsids;
    type PhaseSelector = SavedPhases;
    type Restarter = R;
    type ClauseManager = LbdClauseManagement;
}

#[derive(Debug, Clone)]
struct PhaseSelectorConfig<P: PhaseSelector>(PhantomData<P>);

impl<P: PhaseSelector> SolverConfig for PhaseSelectorConfig<P> {
    type Propagator = WatchedLiterals;
    type VariableSelector = Vsids;
    type PhaseSelector = P;
    type Restarter = Luby;
    type ClauseManager = LbdClauseManagement;
}

#[derive(Debug, Clone)]
struct PropagatorConfig<P: Propagator>(PhantomData<P>);

impl<P: Propagator> SolverConfig for PropagatorConfig<P> {
    type Propagator = P;
    type VariableSelector = Vsids;
    type PhaseSelector = SavedPhases;
    type Restarter = Luby;
    type ClauseManager = LbdClauseManagement;
}

#[derive(Debug, Clone)]
struct ManagerConfig<M: ClauseManagement>(PhantomData<M>);

impl<M: ClauseManagement> SolverConfig for ManagerConfig<M> {
    type Propagator = WatchedLiterals;
    type VariableSelector = Vsids;
    type PhaseSelector = SavedPhases;
    type Restarter = Luby;
    type ClauseManager = M;
}

/// Uniform random 3-SAT with `num_clauses` clauses over `num_vars` variables.
fn random_3sat(num_vars: u32, num_clauses: usize, seed: u64) -> Cnf {
    let mut rng = fastrand::Rng::with_seed(seed);
    let clauses: Vec<Vec<i32>> = (0..num_clauses)
        .map(|_| {
            let mut vars = Vec::with_capacity(3);
            while vars.len() < 3 {
                let v = rng.u32(1..=num_vars);
                if !vars.contains(&v) {
                    vars.push(v);
                }
            }
            vars.into_iter()
                .map(|v| {
                    let v = i32::try_from(v).unwrap();
                    if rng.bool() { v } else { -v }
                })
                .collect()
        })
        .collect();
    Cnf::with_num_vars(num_vars as usize, clauses).unwrap()
}

/// `holes + 1` pigeons in `holes` holes.
fn pigeonhole(holes: i32) -> Cnf {
    let pigeons = holes + 1;
    let var = |p: i32, h: i32| p * holes + h + 1;
    let mut clauses: Vec<Vec<i32>> = (0..pigeons)
        .map(|p| (0..holes).map(|h| var(p, h)).collect())
        .collect();
    for h in 0..holes {
        for p in 0..pigeons {
            for q in p + 1..pigeons {
                clauses.push(vec![-var(p, h), -var(q, h)]);
            }
        }
    }
    Cnf::new(clauses).unwrap()
}

fn instances() -> Vec<Cnf> {
    let mut cnfs: Vec<Cnf> = (0..20).map(|seed| random_3sat(50, 213, seed)).collect();
    cnfs.push(pigeonhole(6));
    cnfs
}

fn solve_all<Config: SolverConfig>(cnfs: &[Cnf]) {
    for cnf in cnfs {
        let mut state: Cdcl<Config> = Solver::new(cnf.clone());
        black_box(state.solve().unwrap());
    }
}

fn bench_variable_selection(c: &mut Criterion) {
    let cnfs = instances();
    let mut group = c.benchmark_group("3sat - variable selection");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("Vsids", |b| {
        b.iter(|| solve_all::<SelectorConfig<Vsids>>(&cnfs));
    });
    group.bench_function("Fixed Order", |b| {
        b.iter(|| solve_all::<SelectorConfig<FixedOrder>>(&cnfs));
    });
    group.bench_function("Random Order", |b| {
        b.iter(|| solve_all::<SelectorConfig<RandomOrder>>(&cnfs));
    });

    group.finish();
}

fn bench_restarter(c: &mut Criterion) {
    let cnfs = instances();
    let mut group = c.benchmark_group("3sat - restarter");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("Luby", |b| {
        b.iter(|| solve_all::<RestarterConfig<Luby>>(&cnfs));
    });
    group.bench_function("Geometric", |b| {
        b.iter(|| solve_all::<RestarterConfig<Geometric>>(&cnfs));
    });
    group.bench_function("Fixed", |b| {
        b.iter(|| solve_all::<RestarterConfig<Fixed>>(&cnfs));
    });
    group.bench_function("Never", |b| {
        b.iter(|| solve_all::<RestarterConfig<Never>>(&cnfs));
    });

    group.finish();
}

fn bench_phase_selection(c: &mut Criterion) {
    let cnfs = instances();
    let mut group = c.benchmark_group("3sat - phase selection");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("Saved", |b| {
        b.iter(|| solve_all::<PhaseSelectorConfig<SavedPhases>>(&cnfs));
    });
    group.bench_function("Fixed", |b| {
        b.iter(|| solve_all::<PhaseSelectorConfig<FixedPhase>>(&cnfs));
    });

    group.finish();
}

fn bench_propagator(c: &mut Criterion) {
    let cnfs = instances();
    let mut group = c.benchmark_group("3sat - propagator");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("Watched Literals", |b| {
        b.iter(|| solve_all::<PropagatorConfig<WatchedLiterals>>(&cnfs));
    });
    group.bench_function("Unit Search", |b| {
        b.iter(|| solve_all::<PropagatorConfig<UnitSearch>>(&cnfs));
    });

    group.finish();
}

fn bench_clause_management(c: &mut Criterion) {
    let cnfs = vec![pigeonhole(7)];
    let mut group = c.benchmark_group("pigeonhole - clause management");
    group.sample_size(10);

    group.bench_function("Lbd", |b| {
        b.iter(|| solve_all::<ManagerConfig<LbdClauseManagement>>(&cnfs));
    });
    group.bench_function("None", |b| {
        b.iter(|| solve_all::<ManagerConfig<NoClauseManagement>>(&cnfs));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_variable_selection,
    bench_restarter,
    bench_phase_selection,
    bench_propagator,
    bench_clause_management
);
criterion_main!(benches);
