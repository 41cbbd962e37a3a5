//! Deciding whether a converged saddle point is the transition state of the
//! intended abstraction

use std::fmt::Display;

use geom::{ActiveSite, Atom, Structure, vector::normalize};
use qcjobs::program::most_negative;

use crate::construct::Reaction;

/// C-H distance in Å the abstracted hydrogen is put back at when a saddle
/// point search is restarted
const PERTURBED_CH: f64 = 1.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// no negative frequency at all
    NoImaginaryMode,
    /// a weak imaginary mode on a geometry that is not an abstraction
    DistortedGeometry,
    /// the displacement vectors do not match the geometry
    WrongModeSize { want: usize, got: usize },
    /// displacing along the mode does not form and break the H···O bond
    NoBondChange,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::NoImaginaryMode => write!(f, "no imaginary frequency"),
            Rejection::DistortedGeometry => {
                write!(f, "distorted active site")
            }
            Rejection::WrongModeSize { want, got } => write!(
                f,
                "imaginary mode has {got} displacements for {want} atoms"
            ),
            Rejection::NoBondChange => {
                write!(f, "imaginary mode does not move H along C-H-O")
            }
        }
    }
}

/// the geometry heuristic for weak imaginary modes: a C-H bond that never
/// stretched, or a hydrogen that left the C-H-O line before reaching O
fn bad_geometry(atoms: &[Atom], site: ActiveSite) -> bool {
    let (ch, ho, cho) = site.measure(&Structure::new(atoms.to_vec()));
    ch < 1.1 || (ho > 1.40 && cho < 170.0)
}

/// H···O distance after displacing `atoms` by `sign` times `mode`
fn displaced_ho(
    atoms: &[Atom],
    mode: &[[f64; 3]],
    site: ActiveSite,
    sign: f64,
) -> f64 {
    let (_, h, o) = site.zero_based();
    let at = |i: usize| {
        let [dx, dy, dz] = mode[i];
        atoms[i].pos() + sign * geom::Vec3::new(dx, dy, dz)
    };
    (at(h) - at(o)).norm()
}

/// validate a converged saddle point. returns the imaginary frequency when
/// the structure is accepted.
///
/// The most negative frequency is taken as the reaction mode. Modes weaker
/// than `cutoff` must pass [bad_geometry] first. Then the geometry is
/// displaced both ways along `mode`: if the H···O distance grows one way and
/// shrinks the other the mode is the abstraction, otherwise only a mode
/// stronger than `cutoff` is accepted.
pub fn validate(
    freqs: &[f64],
    atoms: &[Atom],
    site: ActiveSite,
    mode: Option<&[[f64; 3]]>,
    cutoff: f64,
) -> Result<f64, Rejection> {
    let (_, imag) = most_negative(freqs).ok_or(Rejection::NoImaginaryMode)?;
    if imag > cutoff && bad_geometry(atoms, site) {
        return Err(Rejection::DistortedGeometry);
    }
    let mode = mode.unwrap_or_default();
    if mode.len() != atoms.len() {
        return Err(Rejection::WrongModeSize {
            want: atoms.len(),
            got: mode.len(),
        });
    }
    let ho = displaced_ho(atoms, mode, site, 0.0);
    let plus = displaced_ho(atoms, mode, site, 1.0) - ho;
    let minus = displaced_ho(atoms, mode, site, -1.0) - ho;
    if plus * minus < 0.0 || imag < cutoff {
        Ok(imag)
    } else {
        Err(Rejection::NoBondChange)
    }
}

/// [validate] a saddle point for `reaction`. only abstractions move a
/// hydrogen between the atoms of the active site, so for additions any
/// imaginary mode is accepted
pub fn validate_reaction(
    reaction: Reaction,
    freqs: &[f64],
    atoms: &[Atom],
    site: ActiveSite,
    mode: Option<&[[f64; 3]]>,
    cutoff: f64,
) -> Result<f64, Rejection> {
    match reaction {
        Reaction::Abstraction => validate(freqs, atoms, site, mode, cutoff),
        Reaction::Addition | Reaction::OhAddition => most_negative(freqs)
            .map(|(_, f)| f)
            .ok_or(Rejection::NoImaginaryMode),
    }
}

/// put the abstracted hydrogen back on the C→O line, [PERTURBED_CH] from the
/// carbon, to restart a saddle point search that went astray
pub fn perturb(atoms: &[Atom], site: ActiveSite) -> Vec<Atom> {
    let (c, h, o) = site.zero_based();
    let mut ret = atoms.to_vec();
    let dir = normalize(atoms[o].pos() - atoms[c].pos());
    ret[h].set_pos(atoms[c].pos() + dir * PERTURBED_CH);
    ret
}
