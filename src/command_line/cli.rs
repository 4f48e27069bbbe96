#![allow(clippy::cast_precision_loss)]

use cdcl_sat::sat::cdcl::Cdcl;
use cdcl_sat::sat::clause_management::ClauseManagementType;
use cdcl_sat::sat::cnf::Cnf;
use cdcl_sat::sat::dimacs::{parse_dimacs, parse_file};
use cdcl_sat::sat::error::SolverError;
use cdcl_sat::sat::phase_saving::PhaseSelectorType;
use cdcl_sat::sat::propagation::PropagatorType;
use cdcl_sat::sat::restarter::RestarterType;
use cdcl_sat::sat::solver::{
    DynamicConfig, SolutionStats, SolveResult, Solver, SolverOptions,
};
use cdcl_sat::sat::variable_selection::VariableSelectionType;
use clap::{Args, Parser, Subcommand};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tikv_jemalloc_ctl::{epoch, stats};
use tracing::warn;

/// Exit code for inputs that could not be read or solved.
pub(crate) const EXIT_ERROR: i32 = 1;

/// Defines the command-line interface for the solver.
///
/// Uses `clap` for parsing arguments.
#[derive(Parser, Debug)]
#[command(name = "cdcl-sat", version, about = "A CDCL SAT solver")]
pub(crate) struct Cli {
    /// An optional global path argument. If provided without a subcommand,
    /// it's treated as the path to a DIMACS .cnf file to solve.
    pub path: Option<PathBuf>,

    /// Specifies the subcommand to execute (e.g. `file`, `text`, `dir`).
    #[clap(subcommand)]
    pub command: Option<Commands>,

    /// Common options applicable to all commands.
    #[command(flatten)]
    pub common: CommonOptions,
}

/// Enumerates the available subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Solve a CNF file in DIMACS format.
    File {
        /// Path to the DIMACS .cnf file.
        #[arg(long)]
        path: PathBuf,

        #[command(flatten)]
        common: CommonOptions,
    },

    /// Solve a CNF formula provided as plain text.
    Text {
        /// DIMACS clauses as a string (e.g. "1 -2 0\n2 3 0").
        /// Literals are space-separated and 0 terminates a clause.
        #[arg(short, long)]
        input: String,

        #[command(flatten)]
        common: CommonOptions,
    },

    /// Solve every .cnf file below a directory.
    Dir {
        /// Directory to walk.
        #[arg(long)]
        path: PathBuf,

        #[command(flatten)]
        common: CommonOptions,
    },

    /// Generate shell completion scripts.
    Completions {
        /// The shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Options shared by every solving subcommand.
#[derive(Args, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CommonOptions {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, default_value_t = false)]
    pub(crate) debug: bool,

    /// Check a found model against the input formula.
    #[arg(short, long, default_value_t = false)]
    pub(crate) verify: bool,

    /// Print problem and search statistics after solving.
    #[arg(short, long, default_value_t = false)]
    pub(crate) stats: bool,

    /// Print the satisfying assignment if the formula is satisfiable.
    #[arg(short, long, default_value_t = false)]
    pub(crate) print_solution: bool,

    /// Keep every learnt clause instead of pruning the database.
    #[arg(long, default_value_t = false)]
    pub(crate) no_clause_management: bool,

    #[arg(long, default_value_t = PropagatorType::WatchedLiterals)]
    pub(crate) propagator: PropagatorType,

    #[arg(long, default_value_t = VariableSelectionType::Vsids)]
    pub(crate) variable_selection: VariableSelectionType,

    #[arg(long, default_value_t = PhaseSelectorType::SavedPhases)]
    pub(crate) phase_selection: PhaseSelectorType,

    #[arg(long, default_value_t = RestarterType::Luby)]
    pub(crate) restart_strategy: RestarterType,

    /// VSIDS decay factor, in (0, 1).
    #[arg(long, default_value_t = 0.95)]
    pub(crate) vsids_decay: f64,

    /// Conflicts per unit of the restart schedule.
    #[arg(long, default_value_t = 100)]
    pub(crate) restart_base: usize,

    /// Number of learnt clauses kept before the database is pruned.
    #[arg(long, default_value_t = 10_000)]
    pub(crate) learned_clause_limit: usize,

    /// Give up after this many conflicts.
    #[arg(long, default_value_t = 1_000_000)]
    pub(crate) max_conflicts: usize,

    /// Search without a conflict budget.
    #[arg(long, default_value_t = false, conflicts_with = "max_conflicts")]
    pub(crate) no_conflict_limit: bool,

    /// Give up after this many decisions.
    #[arg(long)]
    pub(crate) max_decisions: Option<usize>,

    /// Give up after this many seconds.
    #[arg(long)]
    pub(crate) time_limit: Option<f64>,

    /// Seed for randomised strategies.
    #[arg(long, default_value_t = 0)]
    pub(crate) seed: u64,

    /// Probability of flipping a saved phase, in [0, 1].
    #[arg(long, default_value_t = 0.0)]
    pub(crate) phase_noise: f64,
}

impl Default for CommonOptions {
    fn default() -> Self {
        let defaults = SolverOptions::default();
        Self {
            debug: false,
            verify: false,
            stats: false,
            print_solution: false,
            no_clause_management: false,
            propagator: PropagatorType::default(),
            variable_selection: VariableSelectionType::default(),
            phase_selection: PhaseSelectorType::default(),
            restart_strategy: RestarterType::default(),
            vsids_decay: defaults.vsids_decay,
            restart_base: defaults.restart_base,
            learned_clause_limit: defaults.learned_clause_limit,
            max_conflicts: defaults.max_conflicts.unwrap_or(usize::MAX),
            no_conflict_limit: defaults.max_conflicts.is_none(),
            max_decisions: defaults.max_decisions,
            time_limit: None,
            seed: defaults.seed,
            phase_noise: defaults.phase_noise,
        }
    }
}

impl CommonOptions {
    /// Collects the numeric options into `SolverOptions`.
    ///
    /// # Errors
    ///
    /// `SolverError::InvalidOption` for a negative or non-finite time limit.
    pub(crate) fn solver_options(&self) -> Result<SolverOptions, SolverError> {
        let time_limit = self
            .time_limit
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|e| {
                    SolverError::InvalidOption(format!("time limit {secs}: {e}"))
                })
            })
            .transpose()?;

        Ok(SolverOptions::default()
            .with_vsids_decay(self.vsids_decay)
            .with_restart_base(self.restart_base)
            .with_learned_clause_limit(self.learned_clause_limit)
            .with_max_conflicts((!self.no_conflict_limit).then_some(self.max_conflicts))
            .with_max_decisions(self.max_decisions)
            .with_time_limit(time_limit)
            .with_seed(self.seed)
            .with_phase_noise(self.phase_noise))
    }

    const fn clause_management(&self) -> ClauseManagementType {
        if self.no_clause_management {
            ClauseManagementType::NoClauseManagement
        } else {
            ClauseManagementType::LbdClauseManagement
        }
    }
}

/// Builds a solver with the strategies named on the command line.
///
/// # Errors
///
/// `SolverError::InvalidOption` if the numeric options are out of range.
pub(crate) fn get_solver(
    common: &CommonOptions,
    cnf: &Cnf,
) -> Result<Cdcl<DynamicConfig>, SolverError> {
    let options = common.solver_options()?;
    let propagator = common.propagator.to_impl(cnf);
    let selector = common.variable_selection.to_impl(cnf.num_vars, &options);
    let phases = common.phase_selection.to_impl(cnf.num_vars, &options);
    let restarter = common.restart_strategy.to_impl(&options);
    let manager = common.clause_management().to_impl(cnf, &options);

    Cdcl::<DynamicConfig>::from_parts(
        cnf.clone(),
        options,
        propagator,
        selector,
        phases,
        restarter,
        manager,
    )
}

/// Parses and solves a single DIMACS file, returning the exit code for its verdict.
///
/// # Errors
///
/// If the file cannot be read or parsed, or the solve fails.
pub(crate) fn solve_file(path: &Path, common: &CommonOptions) -> Result<i32, String> {
    let time = Instant::now();
    let cnf = parse_file(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let elapsed = time.elapsed();

    solve_and_report(&cnf, common, Some(path), elapsed)
}

/// Solves a CNF formula given as text.
///
/// # Errors
///
/// If the text is not valid DIMACS or the solve fails.
pub(crate) fn solve_text(input: &str, common: &CommonOptions) -> Result<i32, String> {
    let time = Instant::now();
    let cnf = parse_textual_cnf(input).map_err(|e| e.to_string())?;
    let elapsed = time.elapsed();

    solve_and_report(&cnf, common, None, elapsed)
}

/// Solves a directory of CNF files.
///
/// Every `.cnf` file below `path` is parsed, solved, and reported. Other entries are skipped.
/// A file that fails to parse is reported and does not stop the walk.
///
/// # Errors
///
/// If `path` is not a directory.
pub(crate) fn solve_dir(path: &Path, common: &CommonOptions) -> Result<i32, String> {
    if !path.is_dir() {
        return Err(format!(
            "Provided path is not a directory: {}",
            path.display()
        ));
    }

    let mut exit_code = 0;
    for entry in walkdir::WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }

        if file_path.extension().is_none_or(|ext| ext != "cnf") {
            warn!(path = %file_path.display(), "skipping non-CNF file");
            continue;
        }

        if let Err(e) = solve_file(file_path, common) {
            eprintln!("{e}");
            exit_code = EXIT_ERROR;
        }
    }

    Ok(exit_code)
}

/// Checks a found model against the formula and prints the outcome.
///
/// # Errors
///
/// If the model falsifies a clause of `cnf`.
pub(crate) fn verify_solution(cnf: &Cnf, result: &SolveResult) -> Result<(), String> {
    if let Some(solutions) = result.solutions() {
        let ok = cnf.verify(solutions);
        println!("Verified: {ok:?}");
        if !ok {
            return Err("Solution failed verification!".to_string());
        }
    }
    Ok(())
}

/// Runs the solver on `cnf`.
///
/// # Returns
/// The verdict, the time taken to solve, and the statistics collected during the solve.
///
/// # Errors
///
/// If the options are invalid or the search reports an internal error.
pub(crate) fn solve(
    cnf: &Cnf,
    label: Option<&Path>,
    common: &CommonOptions,
) -> Result<(SolveResult, Duration, SolutionStats), String> {
    if let Some(name) = label {
        println!("Solving: {}", name.display());
    }

    tracing::debug!(
        vars = cnf.num_vars,
        clauses = cnf.len(),
        literals = cnf.num_literals(),
        "starting solve"
    );

    let time = Instant::now();
    let mut solver = get_solver(common, cnf).map_err(|e| e.to_string())?;
    let result = solver.solve().map_err(|e| e.to_string())?;
    let elapsed = time.elapsed();

    Ok((result, elapsed, solver.stats()))
}

/// Solves `cnf`, verifies and prints the verdict, and optionally prints statistics.
///
/// # Returns
/// The SAT-competition exit code of the verdict.
///
/// # Errors
///
/// If the solve fails or verification rejects the model.
pub(crate) fn solve_and_report(
    cnf: &Cnf,
    common: &CommonOptions,
    label: Option<&Path>,
    parse_time: Duration,
) -> Result<i32, String> {
    let (result, elapsed, solver_stats) = solve(cnf, label, common)?;

    if common.verify {
        verify_solution(cnf, &result)?;
    }

    if common.stats {
        let (allocated_mib, resident_mib) = memory_usage().unwrap_or_default();
        print_stats(
            parse_time,
            elapsed,
            cnf,
            &solver_stats,
            allocated_mib,
            resident_mib,
        );
    }

    if common.print_solution {
        if let Some(solutions) = result.solutions() {
            println!("Solutions: {solutions}");
        }
    }

    println!("\n{result}");
    Ok(result.exit_code())
}

/// Allocated and resident memory in MiB, as reported by jemalloc.
fn memory_usage() -> Option<(f64, f64)> {
    epoch::advance().ok()?;
    let allocated_bytes = stats::allocated::mib().ok()?.read().ok()?;
    let resident_bytes = stats::resident::mib().ok()?.read().ok()?;
    Some((
        allocated_bytes as f64 / (1024.0 * 1024.0),
        resident_bytes as f64 / (1024.0 * 1024.0),
    ))
}

/// Parses a CNF formula given as text.
///
/// The text is DIMACS without the need for a problem line. A literal `\n` escape (as typed
/// in a shell argument) is read as a line break.
///
/// # Errors
///
/// As `parse_dimacs`.
pub(crate) fn parse_textual_cnf(input: &str) -> Result<Cnf, SolverError> {
    let text = input.replace("\\n", "\n");
    parse_dimacs(Cursor::new(text))
}

/// Prints a single statistic in a formatted table row.
pub(crate) fn stat_line(label: &str, value: impl std::fmt::Display) {
    println!("|  {label:<28} {value:>18}  |");
}

/// Prints a statistic along with its rate per second.
pub(crate) fn stat_line_with_rate(label: &str, value: usize, elapsed: f64) {
    let rate = if elapsed > 0.0 {
        value as f64 / elapsed
    } else {
        0.0
    };
    println!("|  {label:<20} {value:>12} ({rate:>9.0}/sec)  |");
}

/// Prints a summary of problem and search statistics.
///
/// # Arguments
/// * `parse_time` - Duration spent parsing the input.
/// * `elapsed` - Duration spent by the solver.
/// * `cnf` - The input formula.
/// * `s` - `SolutionStats` collected by the solver.
/// * `allocated` - Allocated memory in MiB.
/// * `resident` - Resident memory in MiB.
pub(crate) fn print_stats(
    parse_time: Duration,
    elapsed: Duration,
    cnf: &Cnf,
    s: &SolutionStats,
    allocated: f64,
    resident: f64,
) {
    let elapsed_secs = elapsed.as_secs_f64();

    println!("\n=======================[ Problem Statistics ]=========================");
    stat_line("Parse time (s)", format!("{:.3}", parse_time.as_secs_f64()));
    stat_line("Variables", cnf.num_vars);
    stat_line("Clauses (original)", cnf.non_learnt_idx);
    stat_line("Literals (original)", cnf.num_literals());

    println!("========================[ Search Statistics ]========================");
    stat_line("Learnt clauses", s.learnt_clauses);
    stat_line("Removed clauses", s.removed_clauses);
    stat_line_with_rate("Conflicts", s.conflicts, elapsed_secs);
    stat_line_with_rate("Decisions", s.decisions, elapsed_secs);
    stat_line_with_rate("Propagations", s.propagations, elapsed_secs);
    stat_line_with_rate("Restarts", s.restarts, elapsed_secs);
    stat_line("Backjumps", s.backjumps);
    stat_line(
        "Avg backjump distance",
        format!("{:.2}", s.avg_backjump_distance()),
    );
    stat_line("Max backjump distance", s.max_backjump_distance);
    stat_line("Memory usage (MiB)", format!("{allocated:.2}"));
    stat_line("Resident memory (MiB)", format!("{resident:.2}"));
    stat_line("CPU time (s)", format!("{elapsed_secs:.3}"));
    println!("=====================================================================");
}
