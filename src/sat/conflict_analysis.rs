#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Conflict analysis using the first unique implication point (1UIP) scheme.
//!
//! Starting from the falsified clause, the analyser walks the trail backwards and resolves
//! the working clause with the reason of the most recently assigned current-level literal
//! it contains, until exactly one literal of the current decision level is left. That
//! literal is the 1UIP; its negation becomes the asserting literal of the learnt clause.
//! Literals from lower levels are collected as they are met and never resolved away, and
//! literals fixed at level 0 are dropped altogether since they are false in every model.
//!
//! The learnt clause is then shrunk by basic minimisation: a lower-level literal is dropped
//! when every other literal of its reason clause is already in the clause (or fixed at
//! level 0).

use crate::sat::clause::{Clause, LiteralStorage};
use crate::sat::cnf::{Cnf, DecisionLevel};
use crate::sat::error::{Result, SolverError};
use crate::sat::literal::{Literal, Variable};
use crate::sat::trail::{Reason, Trail};
use rustc_hash::FxHashSet;

/// Outcome of analysing one conflict.
#[derive(Debug, Clone, PartialEq)]
pub enum Conflict {
    /// The conflict does not depend on any decision: the formula is unsatisfiable.
    Ground,
    /// The learnt clause has a single literal, which holds at level 0.
    Unit(Literal),
    /// A learnt clause with at least two literals. Position 0 holds the asserting literal,
    /// position 1 a literal of the backjump level.
    Learned {
        clause: Clause,
        backjump_level: DecisionLevel,
    },
}

impl Conflict {
    /// Level to backjump to before asserting the learnt clause. `None` means UNSAT.
    #[must_use]
    pub const fn backjump_level(&self) -> Option<DecisionLevel> {
        match self {
            Self::Ground => None,
            Self::Unit(_) => Some(0),
            Self::Learned { backjump_level, .. } => Some(*backjump_level),
        }
    }
}

/// Scratch state reused across conflicts.
#[derive(Debug, Clone, Default)]
pub struct Analyser {
    seen: Vec<bool>,
    /// Variables marked during the last analysis: every variable above level 0 of every
    /// resolved clause.
    involved: Vec<Variable>,
    /// Clauses resolved on during the last analysis, the falsified clause first.
    pub resolved: Vec<usize>,
    levels: FxHashSet<DecisionLevel>,
}

impl Analyser {
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self {
            seen: vec![false; num_vars + 1],
            involved: Vec::new(),
            resolved: Vec::new(),
            levels: FxHashSet::default(),
        }
    }

    /// Derives the 1UIP clause for the conflict on clause `c_ref`.
    ///
    /// # Errors
    ///
    /// `SolverError::InvariantViolation` if the trail does not explain the conflict (no
    /// current-level literal in the conflict, or a decision reached while more than one
    /// current-level literal remains).
    pub fn analyse(&mut self, cnf: &Cnf, trail: &Trail, c_ref: usize) -> Result<Conflict> {
        self.resolved.clear();
        self.involved.clear();
        let dl = trail.decision_level();
        if dl == 0 {
            return Ok(Conflict::Ground);
        }

        let mut learnt: LiteralStorage = LiteralStorage::new();
        learnt.push(Literal::default());

        let mut path_c = 0_usize;
        let mut index = trail.len();
        let mut clause_idx = c_ref;
        let mut pivot: Option<Literal> = None;

        let uip = loop {
            self.resolved.push(clause_idx);

            for &q in cnf[clause_idx].iter() {
                let var = q.variable();
                if pivot.is_some_and(|p| p.variable() == var) {
                    continue;
                }
                if self.seen[var as usize] || trail.level(var) == 0 {
                    continue;
                }
                self.seen[var as usize] = true;
                self.involved.push(var);

                if trail.level(var) >= dl {
                    path_c += 1;
                } else {
                    learnt.push(q);
                }
            }

            if path_c == 0 {
                self.clear_seen();
                return Err(SolverError::InvariantViolation(format!(
                    "clause {clause_idx} has no literal at conflict level {dl}"
                )));
            }

            let p = loop {
                if index == 0 {
                    self.clear_seen();
                    return Err(SolverError::InvariantViolation(
                        "conflict analysis ran off the start of the trail".to_string(),
                    ));
                }
                index -= 1;
                let lit = trail[index].lit;
                if self.seen[lit.variable() as usize] {
                    break lit;
                }
            };

            self.seen[p.variable() as usize] = false;
            path_c -= 1;
            if path_c == 0 {
                break p;
            }

            clause_idx = match trail.reason(p.variable()) {
                Reason::Clause(idx) => idx,
                Reason::Decision => {
                    self.clear_seen();
                    return Err(SolverError::InvariantViolation(format!(
                        "reached decision {p} with {path_c} current-level literals left"
                    )));
                }
            };
            pivot = Some(p);
        };

        learnt[0] = !uip;
        self.minimise(cnf, trail, &mut learnt);
        self.clear_seen();

        if learnt.len() == 1 {
            return Ok(Conflict::Unit(learnt[0]));
        }

        let mut max_i = 1;
        for i in 2..learnt.len() {
            if trail.level(learnt[i].variable()) > trail.level(learnt[max_i].variable()) {
                max_i = i;
            }
        }
        learnt.swap(1, max_i);
        let backjump_level = trail.level(learnt[1].variable());

        let lbd = self.lbd(trail, &learnt);
        Ok(Conflict::Learned {
            clause: Clause::learnt(learnt, lbd),
            backjump_level,
        })
    }

    /// Drops lower-level literals implied by the rest of the clause.
    fn minimise(&self, cnf: &Cnf, trail: &Trail, learnt: &mut LiteralStorage) {
        let mut i = 1;
        while i < learnt.len() {
            let var = learnt[i].variable();
            let redundant = match trail.reason(var) {
                Reason::Decision => false,
                Reason::Clause(r) => cnf[r].iter().all(|l| {
                    let v = l.variable();
                    v == var || self.seen[v as usize] || trail.level(v) == 0
                }),
            };
            if redundant {
                learnt.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Number of distinct decision levels among the literals.
    fn lbd(&mut self, trail: &Trail, literals: &[Literal]) -> u32 {
        self.levels.clear();
        self.levels
            .extend(literals.iter().map(|l| trail.level(l.variable())));
        u32::try_from(self.levels.len()).unwrap_or(u32::MAX)
    }

    /// Variables that took part in the last analysis, to be bumped by the branching
    /// heuristic.
    #[must_use]
    pub fn involved_variables(&self) -> &[Variable] {
        &self.involved
    }

    fn clear_seen(&mut self) {
        for &var in &self.involved {
            self.seen[var as usize] = false;
        }
    }
}
