#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Polarity choice for decisions.

use crate::sat::literal::{Literal, Variable};
use crate::sat::solver::SolverOptions;
use bit_vec::BitVec;
use clap::ValueEnum;
use fastrand::Rng;
use std::fmt::{Debug, Display};

pub trait PhaseSelector: Debug + Clone {
    fn new(num_vars: usize, options: &SolverOptions) -> Self;

    /// Remembers the value a variable had when it was unassigned.
    fn save(&mut self, lit: Literal);

    /// Polarity for the next decision on `var`.
    fn get_next(&mut self, var: Variable) -> bool;
}

/// Phase saving: decide a variable with the value it last had, `true` the first time.
/// With `phase_noise > 0` the saved value is flipped at that rate.
#[derive(Clone, Debug)]
pub struct SavedPhases {
    phases: BitVec,
    noise: f64,
    rng: Rng,
}

impl PhaseSelector for SavedPhases {
    fn new(num_vars: usize, options: &SolverOptions) -> Self {
        Self {
            phases: BitVec::from_elem(num_vars + 1, true),
            noise: options.phase_noise,
            rng: Rng::with_seed(options.seed),
        }
    }

    fn save(&mut self, lit: Literal) {
        self.phases.set(lit.variable() as usize, lit.polarity());
    }

    fn get_next(&mut self, var: Variable) -> bool {
        let phase = self.phases.get(var as usize).unwrap_or(true);
        if self.noise > 0.0 && self.rng.f64() < self.noise {
            !phase
        } else {
            phase
        }
    }
}

/// Always `true`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FixedPhase;

impl PhaseSelector for FixedPhase {
    fn new(_num_vars: usize, _options: &SolverOptions) -> Self {
        Self
    }

    fn save(&mut self, _lit: Literal) {}

    fn get_next(&mut self, _var: Variable) -> bool {
        true
    }
}

#[derive(Clone, Debug)]
pub enum PhaseSelectorImpls {
    SavedPhases(SavedPhases),
    FixedPhase(FixedPhase),
}

impl PhaseSelector for PhaseSelectorImpls {
    fn new(num_vars: usize, options: &SolverOptions) -> Self {
        Self::SavedPhases(SavedPhases::new(num_vars, options))
    }

    fn save(&mut self, lit: Literal) {
        match self {
            Self::SavedPhases(p) => p.save(lit),
            Self::FixedPhase(p) => p.save(lit),
        }
    }

    fn get_next(&mut self, var: Variable) -> bool {
        match self {
            Self::SavedPhases(p) => p.get_next(var),
            Self::FixedPhase(p) => p.get_next(var),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum PhaseSelectorType {
    /// Reuse the last value of each variable
    #[default]
    SavedPhases,
    /// Always try true first
    FixedPhase,
}

impl Display for PhaseSelectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SavedPhases => write!(f, "saved-phases"),
            Self::FixedPhase => write!(f, "fixed-phase"),
        }
    }
}

impl PhaseSelectorType {
    #[must_use]
    pub fn to_impl(self, num_vars: usize, options: &SolverOptions) -> PhaseSelectorImpls {
        match self {
            Self::SavedPhases => PhaseSelectorImpls::SavedPhases(SavedPhases::new(num_vars, options)),
            Self::FixedPhase => PhaseSelectorImpls::FixedPhase(FixedPhase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_phases_default_true() {
        let mut p = SavedPhases::new(3, &SolverOptions::default());
        assert!(p.get_next(1));
        assert!(p.get_next(3));
    }

    #[test]
    fn test_saved_phases_remember_last_value() {
        let mut p = SavedPhases::new(3, &SolverOptions::default());
        p.save(Literal::new(2, false));
        assert!(!p.get_next(2));
        p.save(Literal::new(2, true));
        assert!(p.get_next(2));
    }

    #[test]
    fn test_full_noise_always_flips() {
        let opts = SolverOptions::default().with_phase_noise(1.0);
        let mut p = SavedPhases::new(2, &opts);
        p.save(Literal::new(1, false));
        assert!(p.get_next(1));
        assert!(!p.get_next(2));
    }

    #[test]
    fn test_fixed_phase() {
        let mut p = PhaseSelectorType::FixedPhase.to_impl(2, &SolverOptions::default());
        p.save(Literal::new(1, false));
        assert!(p.get_next(1));
    }
}
