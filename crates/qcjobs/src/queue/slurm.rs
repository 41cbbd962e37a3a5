use std::collections::HashMap;

use super::{JobStatus, Queue, SubmitError};

/// Slurm is a type for holding the information for submitting a slurm job
#[derive(Debug, Default)]
pub struct Slurm {
    pub(crate) template: Option<String>,
}

impl Slurm {
    pub fn new(template: Option<String>) -> Self {
        Self { template }
    }

    /// run `squeue -u $USER`. form of the output is:
    ///
    ///    JOBID PARTITION   NAME     USER ST        TIME  NODES NODELIST(REASON)
    /// 30627992   compute  c3oh-   mdavis  R 46-17:12:23      1 node2
    fn stat_cmd() -> Result<String, SubmitError> {
        let user = std::env::var("USER")
            .map_err(|_| SubmitError::Status("$USER is not set".to_owned()))?;
        let out = std::process::Command::new("squeue")
            .args(["-u", &user])
            .output()
            .map_err(|e| SubmitError::Status(format!("squeue: {e}")))?;
        if !out.status.success() {
            return Err(SubmitError::Status(
                String::from_utf8_lossy(&out.stderr).trim().to_owned(),
            ));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

/// parse the output of `squeue`. completing jobs are left out to combat the
/// stuck completing bug, and pending array ranges are expanded into one entry
/// per task
pub(crate) fn parse_squeue(out: &str) -> HashMap<String, JobStatus> {
    let mut ret = HashMap::new();
    for line in out.lines() {
        if line.contains("JOBID") || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<_> = line.split_whitespace().collect();
        if fields.len() < 5 {
            log::warn!("unrecognized squeue line `{line}`");
            continue;
        }
        let status = match fields[4] {
            "CG" => continue,
            "PD" => JobStatus::Pending,
            _ => JobStatus::Running,
        };
        for id in expand_array(fields[0]) {
            ret.insert(id, status);
        }
    }
    ret
}

/// expand an array job id like `123_[0-3,5%2]` into `123_0`, ..., `123_3`,
/// `123_5`. plain ids are returned as they are
fn expand_array(id: &str) -> Vec<String> {
    let Some((base, rest)) = id.split_once("_[") else {
        return vec![id.to_owned()];
    };
    let rest = rest.trim_end_matches(']');
    // drop the concurrency limit
    let rest = rest.split('%').next().unwrap_or(rest);
    let mut ret = Vec::new();
    for part in rest.split(',') {
        let range = match part.split_once('-') {
            Some((a, b)) => a.parse::<usize>().ok().zip(b.parse().ok()),
            None => part.parse().ok().map(|a| (a, a)),
        };
        match range {
            Some((a, b)) => ret.extend((a..=b).map(|i| format!("{base}_{i}"))),
            None => log::warn!("unrecognized array range `{part}` in {id}"),
        }
    }
    ret
}

impl Queue for Slurm {
    const SCRIPT_EXT: &'static str = "slurm";

    fn submit_command(&self) -> &str {
        "sbatch"
    }

    fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    fn default_submit_script(&self) -> String {
        include_str!("../../templates/slurm").to_owned()
    }

    fn status(&self) -> Result<HashMap<String, JobStatus>, SubmitError> {
        Ok(parse_squeue(&Self::stat_cmd()?))
    }
}
