//! Writing inputs and submit scripts for an ensemble and handing them to the
//! queue

use std::{
    path::Path,
    time::{Duration, Instant},
};

use qcjobs::{JobStatus, Queue, time};

use crate::{config::Config, error::DatsError, molecule::Molecule, step::Step};

/// never poll less often than this
const MAX_INTERVAL: f64 = 600.0;

/// The result of one submission
#[derive(Debug)]
pub struct Submitted {
    pub job_id: String,
    /// suggested time between polls
    pub interval: Duration,
    pub writing_input: Duration,
    pub submitting: Duration,
}

/// a poll interval for `n` jobs of `atoms` atoms at `step`. slower steps,
/// bigger molecules, and bigger arrays are polled less often
pub fn poll_interval(step: Step, atoms: usize, n: usize) -> Duration {
    let base = match step {
        Step::ConformerSampling | Step::SinglePoint => 120.0,
        Step::TsOpt => 90.0,
        _ => 60.0,
    };
    let secs = base * (1.0 + atoms as f64 / 10.0) * (1.0 + (n.max(1) as f64).ln());
    Duration::from_secs_f64(secs.min(MAX_INTERVAL))
}

pub struct Submitter<'a, Q: Queue> {
    queue: &'a Q,
    config: &'a Config,
}

impl<'a, Q: Queue> Submitter<'a, Q> {
    pub fn new(queue: &'a Q, config: &'a Config) -> Self {
        Self { queue, config }
    }

    /// write the input for every molecule in `mols` and submit them as one
    /// job named `name`: a plain job for one molecule, an array job for more.
    /// the molecules share a directory, which is where the script is written
    /// and run. on success every molecule carries its job id, `<id>` for a
    /// plain job and `<id>_<index>` for an array task
    pub fn submit(
        &self,
        mols: &mut [Molecule],
        name: &str,
    ) -> Result<Submitted, DatsError> {
        let Some(first) = mols.first() else {
            return Err(DatsError::Configuration(format!(
                "nothing to submit for {name}"
            )));
        };
        let dir = first.directory.clone();
        if let Some(m) = mols.iter().find(|m| m.directory != dir) {
            return Err(DatsError::Configuration(format!(
                "{} is not in {}",
                m.name,
                dir.display()
            )));
        }

        let mut commands = Vec::with_capacity(mols.len());
        time!(writing_input, {
            for mol in mols.iter() {
                let calc = mol.calculation(self.config, mol.error_termination_count)?;
                let program = mol.program.program();
                program.write_input(&calc, &dir)?;
                commands.push(program.command(&calc));
            }
        });

        let script = dir.join(format!("{name}.{}", Q::SCRIPT_EXT));
        let res = self.config.resources();
        let now = Instant::now();
        self.queue.write_submit_script(&commands, &res, &script)?;
        let job_id = self.queue.submit(&script).inspect_err(|e| {
            log::error!("failed to submit {}: {e}", script.display());
        })?;
        let submitting = now.elapsed();

        let single = mols.len() == 1;
        for (i, mol) in mols.iter_mut().enumerate() {
            mol.job_id = Some(if single {
                job_id.clone()
            } else {
                format!("{job_id}_{i}")
            });
            mol.status = JobStatus::Pending;
            mol.log_file = Some(mol.log_path());
        }
        let atoms = mols.iter().map(|m| m.atoms().len()).max().unwrap_or(0);
        let interval = match self.config.interval {
            Some(s) => Duration::from_secs(s),
            None => poll_interval(mols[0].step, atoms, mols.len()),
        };
        log::info!(
            "submitted {} jobs for {name} as {job_id} from {}",
            mols.len(),
            script_dir(&script).display()
        );
        Ok(Submitted {
            job_id,
            interval,
            writing_input,
            submitting,
        })
    }
}

fn script_dir(script: &Path) -> &Path {
    script.parent().unwrap_or(Path::new("."))
}
