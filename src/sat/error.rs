#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Error types for formula construction, parsing and solving.
//!
//! Running out of budget is not an error: it is reported as `SolveResult::Unknown`.

use thiserror::Error;

/// Why a clause was rejected while building a formula.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidClause {
    /// The clause contains a literal and its complement.
    #[error("clause is a tautology on variable {0}")]
    Tautology(u32),

    /// The literal `0` does not name a variable.
    #[error("literal 0 does not name a variable")]
    ZeroLiteral,

    /// The literal's variable lies outside the range a DIMACS literal can name.
    #[error("literal {0} is out of range")]
    LiteralOutOfRange(i32),

    /// A literal refers to a variable outside the declared range.
    #[error("variable {var} exceeds the declared variable count {num_vars}")]
    UndeclaredVariable {
        /// The offending variable.
        var: u32,
        /// The number of declared variables.
        num_vars: u32,
    },
}

/// Errors raised by the solver library.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The input formula is malformed; raised before any search happens.
    #[error("invalid formula: clause {clause}: {reason}")]
    InvalidFormula {
        /// Index of the offending clause in the input.
        clause: usize,
        /// What is wrong with it.
        reason: InvalidClause,
    },

    /// A configuration value is out of range.
    #[error("invalid solver option: {0}")]
    InvalidOption(String),

    /// Malformed DIMACS input.
    #[error("parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// I/O failure while reading input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The search reached a state that a correct implementation never reaches.
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

/// Convenient `Result` alias.
pub type Result<T> = std::result::Result<T, SolverError>;
