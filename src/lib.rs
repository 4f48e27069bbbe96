//! A conflict-driven clause-learning (CDCL) SAT solver.
//!
//! Formulas are read from DIMACS CNF (`sat::dimacs`) or built directly from signed
//! integer clauses (`sat::cnf::Cnf`), and solved by `sat::cdcl::Cdcl`. The strategies the
//! search uses are swappable through `sat::solver::SolverConfig`.

/// The `sat` module implements the solver and its supporting data structures.
pub mod sat;
