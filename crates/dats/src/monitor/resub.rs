//! Moving failed jobs out of the way and putting them back on the queue

use std::path::{Path, PathBuf};

use qcjobs::Queue;

use crate::{
    error::DatsError,
    molecule::Molecule,
    submit::{Submitted, Submitter},
};

/// `<dir>/<name>_redo<n>.<ext>` for the log at `<dir>/<name>.<ext>`
pub(crate) fn redo_path(log: &Path, n: usize) -> PathBuf {
    let stem = log.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let mut name = format!("{stem}_redo{n}");
    if let Some(ext) = log.extension().and_then(|e| e.to_str()) {
        name.push('.');
        name.push_str(ext);
    }
    log.with_file_name(name)
}

/// rename the current log of `mol`, if it wrote one, so the next job starts
/// from a clean file and the failure stays around for inspection
fn move_aside(mol: &Molecule) -> Result<(), DatsError> {
    let log = mol.log_path();
    if !log.exists() {
        return Ok(());
    }
    let dest = redo_path(&log, mol.resubmissions);
    std::fs::rename(&log, &dest)
        .map_err(|e| DatsError::Io(log.display().to_string(), e.kind()))?;
    log::debug!("moved {} to {}", log.display(), dest.display());
    Ok(())
}

/// resubmit the molecules at `indices` as a single job named `name`. each
/// job picks up the convergence settings for its molecule's error count
pub(crate) fn resubmit<Q: Queue>(
    submitter: &Submitter<Q>,
    mols: &mut [Molecule],
    indices: &[usize],
    name: &str,
) -> Result<Submitted, DatsError> {
    let mut batch = Vec::with_capacity(indices.len());
    for &i in indices {
        let mol = &mut mols[i];
        mol.resubmissions += 1;
        move_aside(mol)?;
        batch.push(mol.clone());
    }
    let sub = submitter.submit(&mut batch, name)?;
    for (&i, mol) in indices.iter().zip(batch) {
        log::info!(
            "resubmitted {} as {} (attempt {})",
            mol.name,
            mol.job_id.as_deref().unwrap_or("?"),
            mol.error_termination_count,
        );
        mols[i] = mol;
    }
    Ok(sub)
}
