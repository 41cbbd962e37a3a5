use std::{
    collections::HashMap,
    path::Path,
    process::{Child, Command, Stdio},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use super::{JobStatus, Queue, SubmitError};

/// Minimal implementation for running jobs on the local machine. Submit
/// scripts are run with `bash` as child processes, and array scripts spawn one
/// child per task with `SLURM_ARRAY_TASK_ID` set
#[derive(Debug, Default)]
pub struct Local {
    pub template: Option<String>,
    children: Mutex<HashMap<String, Child>>,
    counter: AtomicUsize,
}

impl Local {
    pub fn new(template: Option<String>) -> Self {
        Self {
            template,
            ..Default::default()
        }
    }

    fn spawn(
        &self,
        script: &Path,
        task: Option<usize>,
    ) -> Result<Child, SubmitError> {
        let mut cmd = Command::new(self.submit_command());
        cmd.arg(script)
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = script.parent().filter(|d| !d.as_os_str().is_empty())
        {
            cmd.current_dir(dir);
        }
        if let Some(task) = task {
            cmd.env("SLURM_ARRAY_TASK_ID", task.to_string());
        }
        cmd.spawn().map_err(|e| {
            SubmitError::Spawn(self.submit_command().to_owned(), e.kind())
        })
    }
}

/// the number of tasks requested by an `#SBATCH --array=0-N` line, if any
fn array_size(script: &str) -> Option<usize> {
    script.lines().find_map(|l| {
        let range = l.strip_prefix("#SBATCH --array=")?;
        let (_, end) = range.trim().split_once('-')?;
        end.parse::<usize>().ok().map(|n| n + 1)
    })
}

impl Queue for Local {
    const SCRIPT_EXT: &'static str = "sh";

    fn submit_command(&self) -> &str {
        "bash"
    }

    fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    fn default_submit_script(&self) -> String {
        "#!/bin/bash
G16_CMD=${G16_CMD:-g16}
ORCA_CMD=${ORCA_CMD:-$(which orca)}
CREST_CMD=${CREST_CMD:-crest}
"
        .into()
    }

    fn submit(&self, script: &Path) -> Result<String, SubmitError> {
        let body = std::fs::read_to_string(script).map_err(|e| {
            SubmitError::Refused {
                script: script.display().to_string(),
                stderr: e.to_string(),
            }
        })?;
        let id = format!("local{}", self.counter.fetch_add(1, Ordering::SeqCst));
        let mut spawned = Vec::new();
        match array_size(&body) {
            Some(n) => {
                for task in 0..n {
                    spawned.push((format!("{id}_{task}"), self.spawn(script, Some(task))?));
                }
            }
            None => spawned.push((id.clone(), self.spawn(script, None)?)),
        }
        let mut children = self
            .children
            .lock()
            .map_err(|e| SubmitError::Status(e.to_string()))?;
        children.extend(spawned);
        Ok(id)
    }

    /// every child still running. finished children are reaped and dropped
    fn status(&self) -> Result<HashMap<String, JobStatus>, SubmitError> {
        let mut children = self
            .children
            .lock()
            .map_err(|e| SubmitError::Status(e.to_string()))?;
        children.retain(|_, child| matches!(child.try_wait(), Ok(None)));
        Ok(children
            .keys()
            .map(|k| (k.clone(), JobStatus::Running))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::queue::{Resources, lookup};

    use super::*;

    #[test]
    fn array_lines() {
        assert_eq!(array_size("#!/bin/bash\n#SBATCH --array=0-4\n"), Some(5));
        assert_eq!(array_size("#!/bin/bash\necho hi\n"), None);
    }

    #[test]
    fn run_array() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.sh");
        let local = Local::default();
        let commands: Vec<String> = (0..3)
            .map(|i| format!("echo {i} > task{i}.txt"))
            .collect();
        local
            .write_submit_script(&commands, &Resources::default(), &script)
            .unwrap();
        let id = local.submit(&script).unwrap();
        assert!(id.starts_with("local"));

        let start = Instant::now();
        loop {
            let status = local.status().unwrap();
            if (0..3).all(|i| lookup(&status, &format!("{id}_{i}")) == JobStatus::Absent) {
                break;
            }
            assert!(start.elapsed() < Duration::from_secs(10));
            std::thread::sleep(Duration::from_millis(20));
        }
        for i in 0..3 {
            let got =
                std::fs::read_to_string(dir.path().join(format!("task{i}.txt")))
                    .unwrap();
            assert_eq!(got.trim(), i.to_string());
        }
    }
}
