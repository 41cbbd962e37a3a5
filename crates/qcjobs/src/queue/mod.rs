use std::{
    collections::HashMap,
    fmt::{Display, Write},
    path::Path,
    process::Command,
};

use serde::{Deserialize, Serialize};

pub mod local;
pub mod slurm;

pub use local::Local;
pub use slurm::Slurm;

/// What the queue says about a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    /// not listed by the queue. the job finished, crashed, or was cancelled;
    /// only its log can tell which
    Absent,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// the submit command could not be started
    Spawn(String, std::io::ErrorKind),
    /// the submit command exited with an error
    Refused { script: String, stderr: String },
    /// the submit command succeeded but printed no job id
    NoJobId(String),
    /// the status command failed
    Status(String),
    WriteScript(String, std::io::ErrorKind),
}

impl Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Spawn(cmd, kind) => {
                write!(f, "failed to run `{cmd}`: {kind}")
            }
            SubmitError::Refused { script, stderr } => {
                write!(f, "failed to submit {script} with `{stderr}`")
            }
            SubmitError::NoJobId(script) => {
                write!(f, "no job id returned for {script}")
            }
            SubmitError::Status(e) => write!(f, "failed to query queue: {e}"),
            SubmitError::WriteScript(script, kind) => {
                write!(f, "failed to write {script}: {kind}")
            }
        }
    }
}

impl std::error::Error for SubmitError {}

/// The resources requested for every job of a submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub cpu: usize,
    /// memory in MB
    pub mem: usize,
    pub partition: String,
    /// wall time in the queue's format
    pub time: String,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            cpu: 4,
            mem: 8000,
            partition: "q24,q28,q36,q40,q48,q64".to_owned(),
            time: "72:00:00".to_owned(),
        }
    }
}

/// look up `id` in the output of [Queue::status]. array tasks are listed as
/// `<id>_<index>`, so a task missing from `status` falls back to a plain
/// (non-array) entry for its base id
pub fn lookup(status: &HashMap<String, JobStatus>, id: &str) -> JobStatus {
    if let Some(s) = status.get(id) {
        return *s;
    }
    if let Some((base, _)) = id.split_once('_')
        && let Some(s) = status.get(base)
    {
        return *s;
    }
    JobStatus::Absent
}

/// A batch queue that jobs can be submitted to and polled from
pub trait Queue: Sync {
    /// the extension to append to submit scripts for this type of Queue
    const SCRIPT_EXT: &'static str;

    fn submit_command(&self) -> &str;

    fn template(&self) -> Option<&str>;

    fn default_submit_script(&self) -> String;

    /// submit `script` to the queue from its own directory and return the job
    /// id, the last whitespace-separated field of the submit command's output
    fn submit(&self, script: &Path) -> Result<String, SubmitError> {
        let name = script.display().to_string();
        let mut cmd = Command::new(self.submit_command());
        cmd.arg(script);
        if let Some(dir) = script.parent().filter(|d| !d.as_os_str().is_empty())
        {
            cmd.current_dir(dir);
        }
        let out = cmd.output().map_err(|e| {
            SubmitError::Spawn(self.submit_command().to_owned(), e.kind())
        })?;
        if !out.status.success() {
            return Err(SubmitError::Refused {
                script: name,
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
            });
        }
        String::from_utf8_lossy(&out.stdout)
            .split_whitespace()
            .last()
            .map(str::to_owned)
            .ok_or(SubmitError::NoJobId(name))
    }

    /// every job the queue knows about. jobs missing from the map are
    /// [JobStatus::Absent]
    fn status(&self) -> Result<HashMap<String, JobStatus>, SubmitError>;

    /// write a submit script running `commands`. more than one command makes
    /// an array job whose task `i` runs `commands[i]`
    fn write_submit_script(
        &self,
        commands: &[String],
        resources: &Resources,
        filename: &Path,
    ) -> Result<(), SubmitError> {
        let basename = filename
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let dir = filename
            .parent()
            .map(|d| d.display().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| ".".to_owned());
        let mut body = self
            .template()
            .map(str::to_owned)
            .unwrap_or_else(|| self.default_submit_script());
        let array = if commands.len() > 1 {
            format!("#SBATCH --array=0-{}", commands.len() - 1)
        } else {
            String::new()
        };
        if !body.contains("{{.array}}") && !array.is_empty() {
            insert_directive(&mut body, &array);
        }
        let mut body = body
            .replace("{{.array}}", &array)
            .replace("{{.basename}}", &basename)
            .replace("{{.filename}}", &filename.display().to_string())
            .replace("{{.dir}}", &dir)
            .replace("{{.cpu}}", &resources.cpu.to_string())
            .replace("{{.mem}}", &resources.mem.to_string())
            .replace("{{.partition}}", &resources.partition)
            .replace("{{.time}}", &resources.time);
        if !body.ends_with('\n') {
            body.push('\n');
        }
        match commands {
            [one] => writeln!(body, "{one}").unwrap(),
            _ => {
                body.push_str("case $SLURM_ARRAY_TASK_ID in\n");
                for (i, c) in commands.iter().enumerate() {
                    writeln!(body, "    {i}) {c} ;;").unwrap();
                }
                body.push_str("esac\n");
            }
        }
        std::fs::write(filename, body).map_err(|e| {
            SubmitError::WriteScript(filename.display().to_string(), e.kind())
        })
    }
}

/// insert `directive` after the last `#SBATCH` line of `body`, or after the
/// shebang if there are none
fn insert_directive(body: &mut String, directive: &str) {
    let mut lines: Vec<&str> = body.lines().collect();
    let pos = lines
        .iter()
        .rposition(|l| l.starts_with("#SBATCH"))
        .or_else(|| lines.iter().position(|l| l.starts_with("#!")))
        .map_or(0, |p| p + 1);
    lines.insert(pos, directive);
    *body = lines.join("\n");
}
