//! Trimming converged conformer ensembles before the expensive steps

use std::collections::BTreeMap;

use kinetics::consts::HARTREE_KCAL;

use crate::{config::Config, molecule::Molecule};

/// the energy window is widened in steps of this many kcal/mol
const CUTOFF_STEP: f64 = 5.0;

/// and at most this far past its starting value
const MAX_WIDENING: f64 = 30.0;

/// ensembles this small are never deduplicated
pub const MIN_DEDUP: usize = 5;

/// keep the conformers within `initial` kcal/mol of the lowest one. when
/// fewer than half survive, the window is widened by 5 kcal/mol at a time, up
/// to 30 kcal/mol past `initial`. conformers without an energy are kept
pub fn energy_cutoff(mols: Vec<Molecule>, initial: f64) -> Vec<Molecule> {
    let Some(low) = mols
        .iter()
        .filter_map(Molecule::rate_energy)
        .min_by(f64::total_cmp)
    else {
        return mols;
    };
    let within = |m: &Molecule, cutoff: f64| {
        m.rate_energy()
            .is_none_or(|e| (e - low) * HARTREE_KCAL <= cutoff)
    };
    let total = mols.len();
    let mut cutoff = initial;
    while cutoff < initial + MAX_WIDENING {
        let kept = mols.iter().filter(|m| within(m, cutoff)).count();
        if 2 * kept >= total {
            break;
        }
        cutoff += CUTOFF_STEP;
    }
    let ret: Vec<_> = mols.into_iter().filter(|m| within(m, cutoff)).collect();
    log::info!(
        "kept {} of {total} conformers within {cutoff:.1} kcal/mol",
        ret.len()
    );
    ret
}

/// drop conformers within `threshold` Å aligned RMSD of a lower one.
/// ensembles of [MIN_DEDUP] or fewer are returned as they are
pub fn dedup(mut mols: Vec<Molecule>, threshold: f64) -> Vec<Molecule> {
    if mols.len() <= MIN_DEDUP {
        return mols;
    }
    mols.sort_by(|a, b| {
        let a = a.rate_energy().unwrap_or(f64::INFINITY);
        let b = b.rate_energy().unwrap_or(f64::INFINITY);
        a.total_cmp(&b)
    });
    let total = mols.len();
    let mut kept: Vec<Molecule> = Vec::new();
    for mol in mols {
        let s = mol.structure();
        let duplicate = kept.iter().find(|k| {
            k.structure().rmsd(&s).is_some_and(|r| r < threshold)
        });
        match duplicate {
            Some(k) => log::debug!("{} duplicates {}", mol.name, k.name),
            None => kept.push(mol),
        }
    }
    log::info!("kept {} of {total} unique conformers", kept.len());
    kept
}

/// apply the configured filters to a converged ensemble. molecules are
/// grouped by abstraction site so that every site keeps its own conformers
pub fn filter(mols: Vec<Molecule>, config: &Config) -> Vec<Molecule> {
    if !config.filter {
        return mols;
    }
    let mut groups: BTreeMap<Option<usize>, Vec<Molecule>> = BTreeMap::new();
    for mol in mols {
        groups.entry(mol.site).or_default().push(mol);
    }
    groups
        .into_values()
        .flat_map(|group| {
            let group = energy_cutoff(group, config.energy_cutoff);
            dedup(group, config.rmsd_threshold)
        })
        .collect()
}
