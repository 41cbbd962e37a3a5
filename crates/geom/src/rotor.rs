use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// classification of a rigid rotor from its principal moments of inertia
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotor {
    /// a single atom, no rotational degrees of freedom
    Atom,
    Diatomic,
    Linear,
    SphericalTop,
    OblateSymmTop,
    ProlateSymmTop,
    AsymmTop,
}

impl Rotor {
    /// Report whether the rotor has only two rotational degrees of freedom
    pub fn is_linear(&self) -> bool {
        matches!(self, Rotor::Diatomic | Rotor::Linear)
    }
}

impl Display for Rotor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Rotor::Atom => "atom",
                Rotor::Diatomic => "diatomic",
                Rotor::Linear => "linear",
                Rotor::SphericalTop => "spherical top",
                Rotor::OblateSymmTop => "oblate symmetric top",
                Rotor::ProlateSymmTop => "prolate symmetric top",
                Rotor::AsymmTop => "asymmetric top",
            }
        )
    }
}
