//! physical constants in SI units unless noted

/// Boltzmann constant in J/K
pub const KB: f64 = 1.380_649e-23;

/// Planck constant in J s
pub const H: f64 = 6.626_070_15e-34;

/// speed of light in cm/s
pub const C_CM: f64 = 2.997_924_58e10;

/// speed of light in m/s
pub(crate) const C_M: f64 = 2.997_924_58e8;

/// Avogadro's number as used for the reference number density
pub const NA: f64 = 6.022e23;

/// Hartree to J
pub const HARTREE_J: f64 = 4.359_744_722_2e-18;

/// Hartree to kcal/mol
pub const HARTREE_KCAL: f64 = 627.509;

/// 1 amu in kg
pub const AMU_KG: f64 = 1.6605e-27;

/// GHz per cm⁻¹
pub const GHZ_PER_WAVENUMBER: f64 = 29.979_245_8;

/// standard pressure in Pa
pub const P_STD: f64 = 101_325.0;

/// gas constant in L atm / (mol K) for the reference number density
pub const R_LATM: f64 = 0.0821;

/// Boltzmann constant in Hartree/K
pub(crate) const KB_AU: f64 = 3.166_815_2e-6;

/// atomic unit of time in s
pub(crate) const AU_TIME: f64 = 2.418_884_326_509e-17;

/// 1 amu in electron masses
pub(crate) const AMU_AU: f64 = 1_822.888_479;
