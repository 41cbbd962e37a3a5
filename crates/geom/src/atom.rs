use std::{fmt::Display, str::FromStr};

use approx::AbsDiffEq;
use serde::{Deserialize, Serialize};

use crate::{Vec3, weights::WEIGHTS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Atom {
    pub atomic_number: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.abs_diff_eq(other, Self::default_epsilon())
    }
}

impl AbsDiffEq for Atom {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        1e-8
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() < epsilon;
        self.atomic_number == other.atomic_number
            && close(self.x, other.x)
            && close(self.y, other.y)
            && close(self.z, other.z)
    }
}

/// xyz-style line with six decimals, the precision every input file uses
impl Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6}",
            self.label(),
            self.x,
            self.y,
            self.z
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomError {
    Fields(String),
    Coordinate(String),
    Symbol(String),
}

impl Display for AtomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomError::Fields(l) => {
                write!(f, "wrong number of fields in atom line `{l}`")
            }
            AtomError::Coordinate(l) => {
                write!(f, "failed to parse coordinate in `{l}`")
            }
            AtomError::Symbol(s) => write!(f, "unknown atomic symbol `{s}`"),
        }
    }
}

impl std::error::Error for AtomError {}

impl FromStr for Atom {
    type Err = AtomError;

    /// parse an Atom from a line like
    ///  C 1.0 1.0 1.0
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<_> = s.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(AtomError::Fields(s.to_owned()));
        }
        let mut coord = [0.0; 3];
        for (c, f) in coord.iter_mut().zip(&fields[1..]) {
            *c = f
                .parse()
                .map_err(|_| AtomError::Coordinate(s.to_owned()))?;
        }
        let atomic_number = symbol_to_number(fields[0])
            .ok_or_else(|| AtomError::Symbol(fields[0].to_owned()))?;
        Ok(Self::new(atomic_number, coord[0], coord[1], coord[2]))
    }
}

pub const NUMBER_TO_SYMBOL: [&str; 55] = [
    "X", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg",
    "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn",
    "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb",
    "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe",
];

/// look up an element symbol case-insensitively. CREST and older scripts
/// write lowercase symbols, Gaussian writes atomic numbers
pub fn symbol_to_number(s: &str) -> Option<usize> {
    if let Ok(n) = s.parse::<usize>() {
        return (n > 0 && n < NUMBER_TO_SYMBOL.len()).then_some(n);
    }
    let s = titlecase(s);
    NUMBER_TO_SYMBOL.iter().skip(1).position(|&x| x == s).map(|i| i + 1)
}

fn titlecase(s: &str) -> String {
    let mut cs = s.chars();
    match cs.next() {
        Some(c) => c.to_uppercase().chain(cs.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

impl Atom {
    pub fn new(atomic_number: usize, x: f64, y: f64, z: f64) -> Self {
        Self {
            atomic_number,
            x,
            y,
            z,
        }
    }

    /// panics on an unknown symbol. use [FromStr] for untrusted input
    pub fn new_from_label(atomic_symbol: &str, x: f64, y: f64, z: f64) -> Self {
        let n = symbol_to_number(atomic_symbol).unwrap_or_else(|| {
            panic!("failed to locate atomic symbol {atomic_symbol}")
        });
        Self::new(n, x, y, z)
    }

    pub fn at(atomic_number: usize, pos: Vec3) -> Self {
        Self::new(atomic_number, pos[0], pos[1], pos[2])
    }

    #[inline]
    pub const fn label(&self) -> &str {
        NUMBER_TO_SYMBOL[self.atomic_number]
    }

    #[inline]
    pub fn pos(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn set_pos(&mut self, pos: Vec3) {
        self.x = pos[0];
        self.y = pos[1];
        self.z = pos[2];
    }

    pub fn is(&self, symbol: &str) -> bool {
        symbol_to_number(symbol) == Some(self.atomic_number)
    }

    pub fn weight(&self) -> f64 {
        WEIGHTS[self.atomic_number]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titlecase() {
        assert_eq!(super::titlecase("AL"), "Al");
        assert_eq!(super::titlecase("al"), "Al");
        assert_eq!(super::titlecase("h"), "H");
    }

    #[test]
    fn parse() {
        let a: Atom = "c 1.0 -2.5 3.25".parse().unwrap();
        assert_eq!(a, Atom::new(6, 1.0, -2.5, 3.25));
        let b: Atom = "8 0.0 0.0 0.0".parse().unwrap();
        assert!(b.is("O"));
        assert_eq!(
            "Qq 0 0 0".parse::<Atom>(),
            Err(AtomError::Symbol("Qq".into()))
        );
        assert!("C 0 0".parse::<Atom>().is_err());
    }

    #[test]
    fn display() {
        let a = Atom::new(1, 0.1234567, -1.0, 2.0);
        assert_eq!(a.to_string(), "H 0.123457 -1.000000 2.000000");
    }
}
