//! Building transition-state guesses from a reactant structure

use std::{fmt::Display, str::FromStr};

use geom::{
    ActiveSite, Atom, Structure, Vec3,
    vector::{normalize, perpendicular, rotate},
};
use serde::{Deserialize, Serialize};

use crate::error::DatsError;

/// C-H bonds shorter than this are abstraction candidates, and the stretched
/// C···H and H···O distances of the guess
const ABSTRACTION_DISTANCE: f64 = 1.35;
const OH_BOND: f64 = 0.97;
/// rotation of the C→H vector placing the hydroxyl hydrogen, 180° minus the
/// H-O-H angle of water
const HOH_ROTATION: f64 = 75.5;
/// sideways push of the abstracted hydrogen away from a linear C-H-O
const H_PERTURBATION: f64 = 0.3;

const DOUBLE_BOND: f64 = 1.36;
/// neighbours within this distance define the plane of a double bond
const NEIGHBOR_DISTANCE: f64 = 1.52;
const ADDITION_DISTANCE: f64 = 1.55;
/// fractional stretch of an attacked double bond
const ELONGATION: f64 = 0.1;
const OH_ADDITION_DISTANCE: f64 = 1.45;
const OH_ADDITION_SHIFT: f64 = 0.1;
/// bonds to a terminal oxygen of an addition partner are shorter than this
const TERMINAL_O_DISTANCE: f64 = 1.5;

/// The reactions transition states can be built for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reaction {
    /// hydrogen abstraction by OH
    Abstraction,
    /// addition of a partner molecule across a C=C bond
    Addition,
    /// OH addition to a C=C bond
    OhAddition,
}

impl FromStr for Reaction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oh" | "abstraction" => Ok(Self::Abstraction),
            "cc" | "addition" => Ok(Self::Addition),
            "oh_cc" | "oh-addition" => Ok(Self::OhAddition),
            _ => Err(format!("unknown reaction `{s}`")),
        }
    }
}

impl Display for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Reaction::Abstraction => "OH",
            Reaction::Addition => "CC",
            Reaction::OhAddition => "OH_CC",
        })
    }
}

impl Reaction {
    /// the name suffix of candidate `k`: `H<k>` for abstractions, `<k>`
    /// otherwise
    pub fn label(&self, k: usize) -> String {
        match self {
            Reaction::Abstraction => format!("H{k}"),
            _ => k.to_string(),
        }
    }
}

/// One transition-state guess
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// numbered from 1 in the order the sites are found
    pub index: usize,
    pub structure: Structure,
    pub site: ActiveSite,
    /// the radical left behind by an abstraction
    pub product: Option<Structure>,
}

/// build every transition-state guess of `reaction` on `s`. additions need
/// the `partner` structure
pub fn construct(
    s: &Structure,
    reaction: Reaction,
    partner: Option<&Structure>,
) -> Result<Vec<Candidate>, DatsError> {
    let ret = match reaction {
        Reaction::Abstraction => abstraction(s),
        Reaction::OhAddition => oh_addition(s),
        Reaction::Addition => {
            let partner = partner.ok_or_else(|| {
                DatsError::Configuration(
                    "CC addition requires a partner structure".into(),
                )
            })?;
            addition(s, partner)?
        }
    };
    log::debug!("built {} {reaction} candidates", ret.len());
    Ok(ret)
}

fn abstraction(s: &Structure) -> Vec<Candidate> {
    let mut ret = Vec::new();
    for (i, h) in s.atoms.iter().enumerate().filter(|(_, a)| a.is("H")) {
        for (j, c) in s.atoms.iter().enumerate().filter(|(_, a)| a.is("C")) {
            let dist = s.distance(i, j);
            if dist >= ABSTRACTION_DISTANCE {
                continue;
            }
            let n_ch = normalize(h.pos() - c.pos());
            let p = perpendicular(n_ch, Vec3::y());

            let mut atoms = s.atoms.clone();
            let new_h = h.pos() + n_ch * (ABSTRACTION_DISTANCE - dist);
            let o = new_h + n_ch * ABSTRACTION_DISTANCE;
            let axis = normalize(normalize(o - h.pos()).cross(&p));
            let h_oh =
                o + rotate(n_ch, axis, HOH_ROTATION.to_radians()) * OH_BOND;
            atoms[i].set_pos(new_h + p * H_PERTURBATION);
            atoms.push(Atom::at(8, o));
            atoms.push(Atom::at(1, h_oh));

            let o_index = atoms.len() - 1;
            let mut product = s.atoms.clone();
            product.remove(i);
            ret.push(Candidate {
                index: ret.len() + 1,
                structure: Structure::new(atoms),
                site: ActiveSite::new(j + 1, i + 1, o_index),
                product: Some(Structure::new(product)),
            });
        }
    }
    ret
}

/// unordered pairs of carbons closer than [DOUBLE_BOND]
fn double_bonds(s: &Structure) -> Vec<(usize, usize)> {
    let carbons: Vec<usize> = (0..s.len()).filter(|&i| s.atoms[i].is("C")).collect();
    let mut ret = Vec::new();
    for (n, &i) in carbons.iter().enumerate() {
        for &j in &carbons[n + 1..] {
            if s.distance(i, j) <= DOUBLE_BOND {
                ret.push((i, j));
            }
        }
    }
    ret
}

/// a unit vector normal to the plane of the C=C bond `i`-`j`, taken from the
/// first other neighbour of `i`. falls back to ẑ for an isolated bond
fn bond_normal(s: &Structure, i: usize, j: usize) -> Vec3 {
    let dir = s.atoms[j].pos() - s.atoms[i].pos();
    let reference = s
        .neighbors(i, NEIGHBOR_DISTANCE)
        .into_iter()
        .find(|&k| k != j)
        .map_or(Vec3::z(), |k| s.atoms[k].pos() - s.atoms[i].pos());
    perpendicular(dir, reference)
}

fn oh_addition(s: &Structure) -> Vec<Candidate> {
    let n = s.len();
    double_bonds(s)
        .into_iter()
        .enumerate()
        .map(|(k, (i, j))| {
            let n_cc = normalize(s.atoms[i].pos() - s.atoms[j].pos());
            let p = bond_normal(s, j, i);
            let mut atoms = s.atoms.clone();
            let pi = atoms[i].pos();
            atoms[i].set_pos(pi + n_cc * OH_ADDITION_SHIFT);
            let o = atoms[j].pos() + p * OH_ADDITION_DISTANCE;
            let h = o + rotate(p, n_cc, 45f64.to_radians()) * OH_BOND;
            atoms.push(Atom::at(8, o));
            atoms.push(Atom::at(1, h));
            Candidate {
                index: k + 1,
                structure: Structure::new(atoms),
                site: ActiveSite::new(j + 1, n + 1, n + 2),
                product: None,
            }
        })
        .collect()
}

/// the first oxygen of `s` with exactly one neighbour, and that neighbour
fn terminal_oxygen(s: &Structure) -> Option<(usize, usize)> {
    (0..s.len()).filter(|&i| s.atoms[i].is("O")).find_map(|i| {
        match s.neighbors(i, TERMINAL_O_DISTANCE).as_slice() {
            [one] => Some((i, *one)),
            _ => None,
        }
    })
}

fn addition(
    s: &Structure,
    partner: &Structure,
) -> Result<Vec<Candidate>, DatsError> {
    let (o, bonded) = terminal_oxygen(partner).ok_or_else(|| {
        DatsError::Configuration(
            "addition partner has no terminal oxygen".into(),
        )
    })?;
    let n = s.len();
    let mut ret = Vec::new();
    for (k, (i, j)) in double_bonds(s).into_iter().enumerate() {
        let dir = s.atoms[j].pos() - s.atoms[i].pos();
        let p = bond_normal(s, i, j);
        let mut atoms = s.atoms.clone();
        let pi = atoms[i].pos();
        atoms[i].set_pos(pi - dir * ELONGATION / 2.0);
        let pj = atoms[j].pos();
        atoms[j].set_pos(pj + dir * ELONGATION / 2.0);

        let first = atoms[i].pos() + p * ADDITION_DISTANCE;
        let axis = normalize(dir.cross(&p));
        for atom in &partner.atoms {
            let rel = atom.pos() - partner.atoms[o].pos();
            let angle = if p.dot(&normalize(rel)) > 0.0 {
                90f64
            } else {
                -90f64
            };
            let rotated = rotate(rel, axis, angle.to_radians());
            atoms.push(Atom::at(atom.atomic_number, first + rel + rotated * 0.1));
        }
        ret.push(Candidate {
            index: k + 1,
            structure: Structure::new(atoms),
            site: ActiveSite::new(i + 1, n + bonded + 1, n + o + 1),
            product: None,
        });
    }
    Ok(ret)
}
