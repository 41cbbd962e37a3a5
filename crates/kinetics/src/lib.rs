//! Transition-state-theory rate constants for bimolecular OH reactions:
//! rigid-rotor/harmonic-oscillator partition functions, the Eckart tunneling
//! correction, and the multi-conformer rate expression.

use std::{error::Error, fmt::Display};

pub mod consts;
pub mod eckart;
pub mod partition;
pub mod rate;

pub use eckart::Eckart;
pub use partition::Thermo;
pub use rate::{RateInput, RateResult, Species, rate_constant};

#[derive(Clone, Debug, PartialEq)]
pub enum RateConstantError {
    /// the reactant side has no OH reference energy
    NoOhReference,
    /// products were supplied without an H2O reference energy
    NoH2oReference,
    /// the named ensemble has no members
    EmptyEnsemble(&'static str),
    /// the lowest transition state has no negative frequency
    NoImaginaryFrequency,
}

impl Display for RateConstantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateConstantError::NoOhReference => {
                write!(f, "no OH reference among the reactants")
            }
            RateConstantError::NoH2oReference => {
                write!(f, "products given without an H2O reference")
            }
            RateConstantError::EmptyEnsemble(role) => {
                write!(f, "no converged {role}")
            }
            RateConstantError::NoImaginaryFrequency => {
                write!(f, "lowest transition state has no imaginary frequency")
            }
        }
    }
}

impl Error for RateConstantError {}
