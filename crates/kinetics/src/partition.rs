use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::consts::{AMU_KG, C_CM, GHZ_PER_WAVENUMBER, H, KB, P_STD};

/// The thermochemical data of one converged structure needed for its
/// partition function
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Thermo {
    /// vibrational frequencies in cm⁻¹. imaginary modes are printed as
    /// negative numbers and do not contribute
    pub frequencies: Vec<f64>,
    /// rotational constants in GHz. zeros mark a linear molecule or an atom
    pub rotational_constants: [f64; 3],
    pub symmetry_number: usize,
    /// mass in amu
    pub mass: f64,
    pub multiplicity: usize,
}

impl Thermo {
    /// harmonic-oscillator partition function measured from the zero-point
    /// level
    pub fn vibrational(&self, t: f64) -> f64 {
        self.frequencies
            .iter()
            .filter(|&&f| f > 0.0)
            .map(|&f| 1.0 / (1.0 - (-(H * C_CM * f) / (KB * t)).exp()))
            .product()
    }

    /// rigid-rotor partition function. one nonzero constant is treated as a
    /// linear rotor and none as an atom
    pub fn rotational(&self, t: f64) -> f64 {
        let sigma = self.symmetry_number.max(1) as f64;
        let wavenumbers: Vec<f64> = self
            .rotational_constants
            .iter()
            .filter(|&&b| b > 0.0)
            .map(|b| b / GHZ_PER_WAVENUMBER)
            .collect();
        let kt_hc = KB * t / (H * C_CM);
        match *wavenumbers.as_slice() {
            [] => 1.0,
            [a, b, c] => kt_hc.powf(1.5) * (PI / (a * b * c)).sqrt() / sigma,
            [b, ..] => kt_hc / (sigma * b),
        }
    }

    /// ideal-gas translational partition function for the volume of one
    /// molecule at standard pressure
    pub fn translational(&self, t: f64) -> f64 {
        let m = self.mass * AMU_KG;
        let lambda = H / (2.0 * PI * m * KB * t).sqrt();
        (KB * t / P_STD) / lambda.powi(3)
    }

    pub fn electronic(&self) -> f64 {
        self.multiplicity.max(1) as f64
    }

    /// the total partition function at temperature `t` in K
    pub fn partition_function(&self, t: f64) -> f64 {
        let q = self.vibrational(t)
            * self.rotational(t)
            * self.translational(t)
            * self.electronic();
        log::trace!("Q({t} K) = {q:.6e}");
        q
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const T: f64 = 298.15;

    #[test]
    fn vibration_ignores_imaginary() {
        let with = Thermo {
            frequencies: vec![-1500.0, 200.0, 1000.0],
            ..Default::default()
        };
        let without = Thermo {
            frequencies: vec![200.0, 1000.0],
            ..Default::default()
        };
        assert_eq!(with.vibrational(T), without.vibrational(T));
        // a 200 cm⁻¹ mode is well populated at room temperature
        let x: f64 = H * C_CM * 200.0 / (KB * T);
        assert_relative_eq!(
            Thermo {
                frequencies: vec![200.0],
                ..Default::default()
            }
            .vibrational(T),
            1.0 / (1.0 - (-x).exp()),
            max_relative = 1e-12
        );
    }

    #[test]
    fn linear_rotor() {
        // OH with B ≈ 18.9 cm⁻¹
        let b = 18.9 * GHZ_PER_WAVENUMBER;
        let oh = Thermo {
            rotational_constants: [0.0, b, b],
            symmetry_number: 1,
            ..Default::default()
        };
        let want = KB * T / (H * C_CM * 18.9);
        assert_relative_eq!(oh.rotational(T), want, max_relative = 1e-12);
        assert_relative_eq!(oh.rotational(T), 10.96, max_relative = 1e-3);
    }

    #[test]
    fn symmetry_divides() {
        let mut water = Thermo {
            rotational_constants: [835.84, 435.35, 286.24],
            symmetry_number: 1,
            ..Default::default()
        };
        let one = water.rotational(T);
        water.symmetry_number = 2;
        assert_relative_eq!(water.rotational(T), one / 2.0);
    }

    #[test]
    fn atom_has_no_rotation() {
        let h = Thermo::default();
        assert_eq!(h.rotational(T), 1.0);
        assert_eq!(h.electronic(), 1.0);
    }

    #[test]
    fn translation_scales_with_mass() {
        let light = Thermo {
            mass: 17.0,
            ..Default::default()
        };
        let heavy = Thermo {
            mass: 68.0,
            ..Default::default()
        };
        assert_relative_eq!(
            heavy.translational(T) / light.translational(T),
            8.0,
            max_relative = 1e-12
        );
    }
}
