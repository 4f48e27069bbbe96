//! # cdcl-sat
//!
//! Command-line front end for the CDCL solver in the `cdcl_sat` library.
//!
//! ## Usage
//!
//! ```sh
//! cdcl-sat [OPTIONS] [PATH] [SUBCOMMAND]
//! ```
//!
//! A bare `PATH` is solved as a DIMACS file. Subcommands:
//!
//! - `file --path <FILE>`: solve a DIMACS file.
//! - `text --input "<CNF>"`: solve clauses given on the command line, e.g. `"1 -2 0\n2 3 0"`.
//! - `dir --path <DIR>`: solve every `.cnf` file below a directory.
//! - `completions <SHELL>`: print a shell completion script.
//!
//! Strategies are chosen with `--propagator`, `--variable-selection`, `--phase-selection`,
//! `--restart-strategy` and `--no-clause-management`. Search limits and tuning knobs are
//! `--max-conflicts`, `--max-decisions`, `--time-limit`, `--vsids-decay`, `--restart-base`,
//! `--learned-clause-limit`, `--seed` and `--phase-noise`.
//!
//! The process exits with 10 for SATISFIABLE, 20 for UNSATISFIABLE, 0 for UNKNOWN and 1 on
//! errors. Logging goes to stderr through `tracing`; `RUST_LOG` overrides `--debug`.

mod command_line;

use crate::command_line::cli::{
    Cli, Commands, CommonOptions, EXIT_ERROR, solve_dir, solve_file, solve_text,
};
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let debug = cli.common.debug
        || match &cli.command {
            Some(
                Commands::File { common, .. }
                | Commands::Text { common, .. }
                | Commands::Dir { common, .. },
            ) => common.debug,
            Some(Commands::Completions { .. }) | None => false,
        };
    init_logging(debug);

    let outcome = run(cli);
    let code = outcome.unwrap_or_else(|e| {
        eprintln!("error: {e}");
        EXIT_ERROR
    });
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Installs the `tracing` subscriber. `RUST_LOG` wins over the `--debug` flag.
fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<i32, String> {
    match cli.command {
        Some(Commands::File { path, common }) => solve_file(&path, &common),
        Some(Commands::Text { input, common }) => solve_text(&input, &common),
        Some(Commands::Dir { path, common }) => solve_dir(&path, &common),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(0)
        }
        None => cli.path.map_or_else(
            || Err("no input given; pass a DIMACS file or a subcommand (see --help)".to_string()),
            |path| {
                let common: &CommonOptions = &cli.common;
                if path.is_dir() {
                    solve_dir(&path, common)
                } else {
                    solve_file(&path, common)
                }
            },
        ),
    }
}
