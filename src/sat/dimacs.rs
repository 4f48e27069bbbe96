#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! A reader for the DIMACS CNF format.
//!
//! The format is line based:
//! - Lines starting with `c` are comments.
//! - The problem line `p cnf <num_variables> <num_clauses>` declares the variable count.
//!   Variables that occur in no clause still get a value in every model. The clause count
//!   is informational; a mismatch is tolerated.
//! - Clauses are whitespace-separated signed integers terminated by `0`. A clause may
//!   span several lines, and several clauses may share a line. A lone `0` is the empty
//!   clause.
//! - A line starting with `%` ends the data (some benchmark suites append garbage after it).
//!
//! Writing goes through the `Display` implementation of `Cnf`.

use crate::sat::cnf::Cnf;
use crate::sat::error::{Result, SolverError};
use std::io::{self, BufRead};
use std::path::Path;

/// Parses DIMACS data from `reader`.
///
/// # Errors
///
/// - `SolverError::Io` if reading fails.
/// - `SolverError::Parse` for a malformed problem line, a token that is not an integer, or
///   the literal `-2147483648`.
/// - `SolverError::InvalidFormula` if a clause is a tautology.
pub fn parse_dimacs<R: BufRead>(reader: R) -> Result<Cnf> {
    let mut declared_vars: Option<usize> = None;
    let mut clauses: Vec<Vec<i32>> = Vec::new();
    let mut current: Vec<i32> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let trimmed = line.trim_start();

        if trimmed.starts_with('%') {
            break;
        }
        if trimmed.starts_with('c') {
            continue;
        }
        if trimmed.starts_with('p') {
            declared_vars = Some(parse_problem_line(trimmed, line_no)?);
            continue;
        }

        for token in trimmed.split_whitespace() {
            let value: i32 = token.parse().map_err(|e| SolverError::Parse {
                line: line_no,
                message: format!("invalid literal '{token}': {e}"),
            })?;
            if value == i32::MIN {
                return Err(SolverError::Parse {
                    line: line_no,
                    message: format!("literal '{token}' is out of range"),
                });
            }
            if value == 0 {
                clauses.push(std::mem::take(&mut current));
            } else {
                current.push(value);
            }
        }
    }

    // Tolerate a missing terminator on the last clause.
    if !current.is_empty() {
        clauses.push(current);
    }

    let used_vars = clauses
        .iter()
        .flatten()
        .map(|l| l.unsigned_abs() as usize)
        .max()
        .unwrap_or(0);
    let num_vars = declared_vars.map_or(used_vars, |declared| declared.max(used_vars));

    Cnf::with_num_vars(num_vars, clauses)
}

/// Reads the variable count from a `p cnf <vars> <clauses>` line.
fn parse_problem_line(line: &str, line_no: usize) -> Result<usize> {
    let parse_error = |message: String| SolverError::Parse {
        line: line_no,
        message,
    };

    let mut parts = line.split_whitespace();
    let _ = parts.next();
    match parts.next() {
        Some("cnf") => {}
        other => {
            return Err(parse_error(format!(
                "expected 'p cnf', found format {}",
                other.unwrap_or("<none>")
            )));
        }
    }

    let vars = parts
        .next()
        .ok_or_else(|| parse_error("missing variable count".to_string()))?;
    let vars = vars
        .parse::<usize>()
        .map_err(|e| parse_error(format!("invalid variable count '{vars}': {e}")))?;

    if let Some(count) = parts.next() {
        count
            .parse::<usize>()
            .map_err(|e| parse_error(format!("invalid clause count '{count}': {e}")))?;
    }
    Ok(vars)
}

/// Parses the DIMACS file at `file_path`.
///
/// # Errors
///
/// As `parse_dimacs`, plus `SolverError::Io` if the file cannot be opened.
pub fn parse_file<P: AsRef<Path>>(file_path: P) -> Result<Cnf> {
    let file = std::fs::File::open(file_path)?;
    parse_dimacs(io::BufReader::new(file))
}
