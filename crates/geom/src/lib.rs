use std::{fmt::Display, str::FromStr};

use nalgebra as na;
use serde::{Deserialize, Serialize};

pub use atom::*;
pub use rotor::Rotor;
pub use site::{ActiveSite, SiteError};

pub mod atom;
pub mod rotor;
pub mod site;
pub mod vector;
mod weights;

#[cfg(test)]
mod tests;

pub type Vec3 = na::Vector3<f64>;
pub type Mat3 = na::Matrix3<f64>;

/// h / (8 pi^2) in GHz amu Å^2, converts a moment of inertia to a rotational
/// constant
const ROTCONST_GHZ: f64 = 505.379_009;

#[macro_export]
macro_rules! structure {
    ($($num:ident $x:literal $y:literal $z:literal)+) => {
	$crate::Structure::new(vec![
	    $($crate::Atom::new_from_label(stringify!($num), $x, $y, $z),)*
	    ])
    };
}

/// An ordered list of atoms in Ångstrom
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub atoms: Vec<Atom>,
}

fn close(a: f64, b: f64, eps: f64) -> bool {
    f64::abs(a - b) < eps
}

impl Structure {
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self { atoms }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// return the atomic numbers of each atoms as a vector
    pub fn atomic_numbers(&self) -> Vec<usize> {
        self.atoms.iter().map(|a| a.atomic_number).collect()
    }

    /// total mass in amu
    pub fn mass(&self) -> f64 {
        self.atoms.iter().map(Atom::weight).sum()
    }

    /// distance in Å between the atoms at 0-based indices `i` and `j`
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        (self.atoms[i].pos() - self.atoms[j].pos()).norm()
    }

    /// angle in degrees at `j` formed by `i`-`j`-`k`, all 0-based
    pub fn angle(&self, i: usize, j: usize, k: usize) -> f64 {
        vector::angle(
            self.atoms[i].pos(),
            self.atoms[j].pos(),
            self.atoms[k].pos(),
        )
    }

    /// indices of the atoms within `cutoff` Å of atom `i`, excluding `i`
    pub fn neighbors(&self, i: usize, cutoff: f64) -> Vec<usize> {
        (0..self.atoms.len())
            .filter(|&j| j != i && self.distance(i, j) < cutoff)
            .collect()
    }

    /// compute the center of mass of `self`, assuming the most abundant isotope
    /// masses
    pub fn com(&self) -> Vec3 {
        let mut sum = 0.0;
        let mut com = Vec3::zeros();
        for atom in &self.atoms {
            let w = atom.weight();
            sum += w;
            com += w * atom.pos();
        }
        com / sum
    }

    /// compute the moment of inertia tensor about the center of mass in amu Å^2
    pub fn moi(&self) -> Mat3 {
        let com = self.com();
        let mut ret = Mat3::zeros();
        for atom in &self.atoms {
            let w = atom.weight();
            let r = atom.pos() - com;
            let (x, y, z) = (r[0], r[1], r[2]);
            ret[(0, 0)] += w * (y * y + z * z);
            ret[(1, 1)] += w * (x * x + z * z);
            ret[(2, 2)] += w * (x * x + y * y);
            ret[(0, 1)] -= w * x * y;
            ret[(0, 2)] -= w * x * z;
            ret[(1, 2)] -= w * y * z;
        }
        ret[(1, 0)] = ret[(0, 1)];
        ret[(2, 0)] = ret[(0, 2)];
        ret[(2, 1)] = ret[(1, 2)];
        ret
    }

    /// the principal moments of inertia in ascending order
    pub fn principal_moments(&self) -> Vec3 {
        let sym = na::SymmetricEigen::new(self.moi());
        let mut vals: Vec<f64> = sym.eigenvalues.iter().copied().collect();
        vals.sort_by(f64::total_cmp);
        Vec3::from_vec(vals)
    }

    /// compute the type of molecular rotor based on the moments of inertia in
    /// `moms` to the tolerance in `eps`. These tests are taken from the
    /// [Crawford Programming
    /// Projects](https://github.com/CrawfordGroup/ProgrammingProjects/blob/master/Project%2301/hints/step7-solution.md)
    pub fn rotor_type(&self, moms: &Vec3, eps: f64) -> Rotor {
        match self.atoms.len() {
            0 | 1 => return Rotor::Atom,
            2 => return Rotor::Diatomic,
            _ => (),
        }
        if moms[0] < eps {
            Rotor::Linear
        } else if close(moms[0], moms[1], eps) && close(moms[1], moms[2], eps) {
            Rotor::SphericalTop
        } else if close(moms[0], moms[1], eps) && !close(moms[1], moms[2], eps)
        {
            Rotor::OblateSymmTop
        } else if !close(moms[0], moms[1], eps) && close(moms[1], moms[2], eps)
        {
            Rotor::ProlateSymmTop
        } else {
            Rotor::AsymmTop
        }
    }

    /// rotational constants in GHz, largest first, in the same convention
    /// Gaussian prints them. vanishing moments are reported as 0.0
    pub fn rotational_constants(&self) -> Vec<f64> {
        if self.atoms.len() < 2 {
            return Vec::new();
        }
        let moms = self.principal_moments();
        moms.iter()
            .map(|&i| if i < 1e-6 { 0.0 } else { ROTCONST_GHZ / i })
            .collect()
    }

    /// translate each of the atoms in `self` by vec
    pub fn translate(&mut self, vec: Vec3) -> &mut Self {
        for atom in self.atoms.iter_mut() {
            atom.set_pos(atom.pos() + vec);
        }
        self
    }

    /// root-mean-square deviation in Å between `self` and `other` after
    /// removing translation and finding the optimal rotation (Kabsch). the two
    /// structures must list the same elements in the same order, otherwise
    /// `None` is returned
    pub fn rmsd(&self, other: &Self) -> Option<f64> {
        if self.atomic_numbers() != other.atomic_numbers() || self.is_empty() {
            return None;
        }
        let n = self.atoms.len() as f64;
        let center = |s: &Self| {
            let c = s.atoms.iter().map(Atom::pos).sum::<Vec3>() / n;
            s.atoms.iter().map(|a| a.pos() - c).collect::<Vec<_>>()
        };
        let p = center(self);
        let q = center(other);
        let mut h = Mat3::zeros();
        for (a, b) in p.iter().zip(&q) {
            h += a * b.transpose();
        }
        let svd = h.svd(true, true);
        let (u, v_t) = (svd.u?, svd.v_t?);
        let v = v_t.transpose();
        let d = (v * u.transpose()).determinant().signum();
        let (imin, _) = svd
            .singular_values
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))?;
        let mut diag = Vec3::repeat(1.0);
        diag[imin] = d;
        let rot = v * Mat3::from_diagonal(&diag) * u.transpose();
        let sum: f64 =
            p.iter().zip(&q).map(|(a, b)| (rot * a - b).norm_squared()).sum();
        Some((sum / n).sqrt())
    }
}

/// standard XYZ block: atom count, comment line, then one atom per line
impl Display for Structure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.atoms.len())?;
        writeln!(f)?;
        for atom in &self.atoms {
            writeln!(f, "{atom}")?;
        }
        Ok(())
    }
}

impl FromStr for Structure {
    type Err = AtomError;

    /// accepts either a full XYZ file (count and comment lines) or bare atom
    /// lines
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s.lines().skip_while(|l| l.trim().is_empty()).peekable();
        if let Some(first) = lines.peek()
            && first.trim().parse::<usize>().is_ok()
        {
            lines.next();
            lines.next();
        }
        let atoms = lines
            .filter(|l| !l.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { atoms })
    }
}

/// split a multi-structure XYZ file, like the conformer ensembles written by
/// CREST, into its frames
pub fn read_frames(s: &str) -> Result<Vec<Structure>, AtomError> {
    let mut ret = Vec::new();
    let mut lines = s.lines();
    while let Some(line) = lines.next() {
        let Ok(n) = line.trim().parse::<usize>() else {
            continue;
        };
        // comment
        lines.next();
        let atoms = lines
            .by_ref()
            .take(n)
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()?;
        ret.push(Structure { atoms });
    }
    Ok(ret)
}
