//! Watching an ensemble of jobs until every molecule has converged or been
//! dropped, resubmitting the ones that fail along the way

use std::{
    collections::HashSet,
    path::Path,
    sync::mpsc::Sender,
    time::{Duration, Instant, SystemTime},
};

use libc::{RUSAGE_SELF, timeval};
use qcjobs::{
    ErrorClass, JobStatus, Procedure, ProgramError, Queue, Termination,
    program::Crest, queue::lookup,
};
use rayon::prelude::*;

use crate::{
    config::Config,
    construct::Reaction,
    error::DatsError,
    molecule::{MAX_ERRORS, Molecule},
    submit::{Submitted, Submitter},
    validate::{perturb, validate_reaction},
};

mod resub;
mod timer;

pub use timer::{Backoff, Clock, SystemClock, VirtualClock};
use timer::Timer;

/// times to look for the log of a job that left the queue
const LOG_RETRIES: usize = 10;

const LOG_BACKOFF: Duration = Duration::from_secs(2);

/// polls an unfinished log may sit unchanged after its job left the queue
const GRACE_POLLS: usize = 5;

/// multiple of the poll interval to wait while every job is pending
const PENDING_FACTOR: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// every molecule is terminal and at least one converged
    Converged,
    AllDropped,
    /// the poll budget ran out with jobs still unaccounted for
    TimedOut,
}

/// what one poll decided for a molecule
#[derive(Debug, PartialEq)]
enum Verdict {
    Wait,
    Converged,
    Resubmit,
    Dropped,
}

/// what the monitor remembers about a log between polls
#[derive(Clone, Default)]
struct Track {
    modtime: Option<SystemTime>,
    unchanged: usize,
}

fn modtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn to_secs(time: timeval) -> f64 {
    time.tv_sec as f64 + time.tv_usec as f64 / 1e6
}

/// return the CPU time used by the current process in seconds
fn get_cpu_time() -> f64 {
    unsafe {
        let mut rusage = std::mem::MaybeUninit::uninit();
        let res = libc::getrusage(RUSAGE_SELF, rusage.as_mut_ptr());
        if res != 0 {
            return 0.0;
        }
        let rusage = rusage.assume_init();
        to_secs(rusage.ru_stime) + to_secs(rusage.ru_utime)
    }
}

/// restart `mol` from the last geometry in its failed log, if there is one
fn restart_geometry(mol: &mut Molecule, contents: &str, proc: Procedure) {
    let Ok(summary) = mol.program.program().parse_log(contents, proc) else {
        return;
    };
    if let Some(atoms) = summary.atoms
        && let Err(e) = mol.set_atoms(atoms)
    {
        log::debug!("keeping the old geometry of {}: {e}", mol.name);
    }
}

pub struct Monitor<'a, Q: Queue, C: Clock> {
    queue: &'a Q,
    config: &'a Config,
    clock: &'a C,
    journal: Option<Sender<String>>,
    backoff: Backoff,
}

impl<'a, Q: Queue, C: Clock> Monitor<'a, Q, C> {
    pub fn new(queue: &'a Q, config: &'a Config, clock: &'a C) -> Self {
        Self {
            queue,
            config,
            clock,
            journal: None,
            backoff: Backoff::Fixed(LOG_BACKOFF),
        }
    }

    /// also record failures in the run journal
    pub fn with_journal(mut self, journal: Option<Sender<String>>) -> Self {
        self.journal = journal;
        self
    }

    fn note(&self, msg: String) {
        log::warn!("{msg}");
        if let Some(tx) = &self.journal {
            let _ = tx.send(msg);
        }
    }

    fn sleep(&self, d: Duration, time: &mut Timer) {
        time.sleeping += d;
        self.clock.sleep(d);
    }

    fn wait(&self, time: &mut Timer, d: Duration, iter: usize, remaining: usize) {
        let date = jiff::Zoned::now().strftime("%Y-%m-%d %H:%M:%S");
        eprintln!(
            "[iter {iter} {date} {:.1} CPU s] {remaining} jobs remaining",
            get_cpu_time()
        );
        self.sleep(d, time);
    }

    /// submit `mols` as the job `name` and watch them until each one is
    /// converged or dropped, or until the configured number of polls is
    /// used up. polls where every job is still pending are free
    pub fn run(
        &self,
        mols: &mut [Molecule],
        name: &str,
    ) -> Result<Outcome, DatsError> {
        let submitter = Submitter::new(self.queue, self.config);
        let mut time = Timer::default();
        let sub = submitter.submit(mols, name)?;
        let interval = sub.interval;
        Self::account(&mut time, &sub);

        let delay = self
            .config
            .initial_delay
            .map_or(interval * 3, Duration::from_secs);
        self.sleep(delay, &mut time);

        let mut tracks = vec![Track::default(); mols.len()];
        let mut pending_seen = HashSet::new();
        let mut attempts = 0;
        let mut iter = 0;
        let mut redo = 0;
        while attempts < self.config.attempts {
            iter += 1;
            let status = match self.queue.status() {
                Ok(s) => s,
                Err(e) => {
                    log::error!("failed to check the queue: {e}");
                    attempts += 1;
                    self.sleep(interval, &mut time);
                    continue;
                }
            };

            let mut active = Vec::new();
            for (i, mol) in mols.iter_mut().enumerate() {
                if mol.is_terminal() {
                    continue;
                }
                mol.status = match &mol.job_id {
                    Some(id) => lookup(&status, id),
                    None => JobStatus::Absent,
                };
                if mol.status == JobStatus::Pending {
                    if let Some(id) = &mol.job_id
                        && pending_seen.insert(id.clone())
                    {
                        log::info!("{} ({id}) is pending", mol.name);
                    }
                } else {
                    active.push(i);
                }
            }

            let remaining = mols.iter().filter(|m| !m.is_terminal()).count();
            if remaining == 0 {
                break;
            }
            if active.is_empty() {
                self.sleep(interval * PENDING_FACTOR, &mut time);
                continue;
            }
            attempts += 1;

            let now = Instant::now();
            let reads: Vec<_> = {
                let mols = &*mols;
                active
                    .par_iter()
                    .map(|&i| {
                        let path = mols[i].log_path();
                        (i, self.read_log(&mols[i]), modtime(&path))
                    })
                    .collect()
            };
            time.reading += now.elapsed();

            let mut resub = Vec::new();
            for (i, read, mtime) in reads {
                let verdict =
                    self.check(&mut mols[i], read, mtime, &mut tracks[i]);
                log::trace!("{}: {verdict:?}", mols[i].name);
                if verdict == Verdict::Resubmit {
                    resub.push(i);
                }
            }

            if !resub.is_empty() {
                redo += 1;
                let sub = resub::resubmit(
                    &submitter,
                    mols,
                    &resub,
                    &format!("{name}_redo{redo}"),
                )?;
                Self::account(&mut time, &sub);
                for &i in &resub {
                    tracks[i] = Track::default();
                }
            }

            let remaining = mols.iter().filter(|m| !m.is_terminal()).count();
            if remaining == 0 {
                break;
            }
            self.wait(&mut time, interval, iter, remaining);
        }
        log::info!("{name}: {time}");

        let outcome = if !mols.iter().all(Molecule::is_terminal) {
            Outcome::TimedOut
        } else if mols.iter().any(|m| m.converged) {
            Outcome::Converged
        } else {
            Outcome::AllDropped
        };
        log::info!(
            "{name} finished after {iter} polls: {outcome:?}, {} of {} converged",
            mols.iter().filter(|m| m.converged).count(),
            mols.len()
        );
        Ok(outcome)
    }

    fn account(time: &mut Timer, sub: &Submitted) {
        time.writing_input += sub.writing_input;
        time.submitting += sub.submitting;
    }

    /// read the log of `mol`. a running job may not have created its log
    /// yet, so a missing log only counts against a job that left the queue,
    /// and only after [LOG_RETRIES] tries
    fn read_log(&self, mol: &Molecule) -> Result<Option<String>, DatsError> {
        let path = mol.log_path();
        let tries = if mol.status == JobStatus::Absent {
            LOG_RETRIES
        } else {
            1
        };
        for n in 0..tries {
            match std::fs::read_to_string(&path) {
                Ok(s) => return Ok(Some(s)),
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    log::debug!("failed to read {}: {e}", path.display());
                }
                Err(_) => {}
            }
            if n + 1 < tries {
                self.clock.sleep(self.backoff.delay(n));
            }
        }
        if mol.status == JobStatus::Absent {
            Err(DatsError::LogUnavailable(path.display().to_string()))
        } else {
            Ok(None)
        }
    }

    /// count a failure against `mol`
    fn failed(&self, mol: &mut Molecule, e: DatsError) -> Verdict {
        let dropped = mol.record_error();
        self.note(format!(
            "{} at {} (error {}/{MAX_ERRORS}): {e}",
            mol.name, mol.step, mol.error_termination_count
        ));
        if dropped {
            self.note(format!("dropping {}", mol.name));
            Verdict::Dropped
        } else {
            Verdict::Resubmit
        }
    }

    fn check(
        &self,
        mol: &mut Molecule,
        read: Result<Option<String>, DatsError>,
        mtime: Option<SystemTime>,
        track: &mut Track,
    ) -> Verdict {
        let contents = match read {
            Ok(Some(c)) => c,
            Ok(None) => return Verdict::Wait,
            Err(e) => return self.failed(mol, e),
        };
        let Some(proc) = mol.step.procedure() else {
            return Verdict::Wait;
        };
        let program = mol.program.program();
        match program.classify(&contents, proc) {
            Termination::Normal => self.finished(mol, &contents, proc),
            Termination::Error(ErrorClass::Intervention) => {
                mol.drop_now();
                self.note(format!(
                    "{} at {}",
                    DatsError::Intervention(mol.name.clone()),
                    mol.step
                ));
                Verdict::Dropped
            }
            Termination::Error(ErrorClass::Convergence) => {
                restart_geometry(mol, &contents, proc);
                let e = DatsError::Convergence(mol.name.clone());
                self.failed(mol, e)
            }
            Termination::Error(ErrorClass::Other) => {
                restart_geometry(mol, &contents, proc);
                let e = ProgramError::ErrorInOutput(
                    mol.log_path().display().to_string(),
                );
                self.failed(mol, e.into())
            }
            Termination::Unfinished { .. } => {
                if mol.status != JobStatus::Absent {
                    *track = Track::default();
                    return Verdict::Wait;
                }
                if mtime.is_some() && track.modtime == mtime {
                    track.unchanged += 1;
                } else {
                    track.modtime = mtime;
                    track.unchanged = 0;
                }
                if track.unchanged >= GRACE_POLLS {
                    let e = DatsError::Abandoned(mol.name.clone());
                    self.failed(mol, e)
                } else {
                    Verdict::Wait
                }
            }
        }
    }

    /// collect the results of a normally terminated job
    fn finished(
        &self,
        mol: &mut Molecule,
        contents: &str,
        proc: Procedure,
    ) -> Verdict {
        if proc == Procedure::ConformerSearch {
            let path = Crest::conformer_file(&mol.directory, &mol.name);
            if !path.exists() {
                let e = DatsError::LogUnavailable(path.display().to_string());
                return self.failed(mol, e);
            }
            mol.mark_converged();
            return Verdict::Converged;
        }
        let summary = match mol.program.program().parse_log(contents, proc) {
            Ok(s) => s,
            Err(e) => return self.failed(mol, e.into()),
        };
        if let Err(e) = mol.apply_summary(summary, proc, self.config.temperature)
        {
            return self.failed(mol, e);
        }
        if proc == Procedure::TsOpt
            && let Some(site) = mol.active_site
        {
            let reaction = self.config.reaction;
            let got = validate_reaction(
                reaction,
                &mol.frequencies,
                mol.atoms(),
                site,
                mol.imaginary_mode.as_deref(),
                self.config.freq_cutoff,
            );
            match got {
                Ok(imag) => {
                    log::info!("{} has imaginary mode {imag:.1}", mol.name)
                }
                Err(why) => {
                    if reaction == Reaction::Abstraction {
                        let atoms = perturb(mol.atoms(), site);
                        if let Err(e) = mol.set_atoms(atoms) {
                            log::error!("failed to perturb {}: {e}", mol.name);
                        }
                    }
                    let e = DatsError::Validation(mol.name.clone(), why);
                    return self.failed(mol, e);
                }
            }
        }
        mol.mark_converged();
        log::info!("{} converged at {}", mol.name, mol.step);
        Verdict::Converged
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, VecDeque},
        path::PathBuf,
        sync::Mutex,
    };

    use geom::{ActiveSite, structure};
    use qcjobs::{ProgramKind, SubmitError};

    use crate::{molecule::Role, step::Step};

    use super::*;

    const TS: &str = include_str!("../../testfiles/ts.log");
    const CONV: &str = include_str!("../../testfiles/conv_error.log");
    const INTERVENTION: &str = include_str!("../../testfiles/intervention.log");
    const UNFINISHED: &str = " Entering Gaussian System, Link 0=g16\n";
    /// a job that died in l202 after printing a new geometry
    const OTHER: &str = " Charge =  0 Multiplicity = 2
                          Input orientation:
 ---------------------------------------------------------------------
 Center     Atomic      Atomic             Coordinates (Angstroms)
 Number     Number       Type             X           Y           Z
 ---------------------------------------------------------------------
      1          6           0        0.000000    0.000000    0.000000
      2          1           0        1.300000    0.000000    0.000000
      3          8           0        2.600000    0.000000    0.000000
      4          1           0        2.850000    0.950000    0.000000
 ---------------------------------------------------------------------
 SCF Done:  E(UwB97XD) =  -115.500000000     A.U. after   14 cycles
 Error termination via Lnk1e in /opt/g16/l202.exe at Mon Jan  1 13:00:00 2024.
";

    /// a queue that never runs anything. each submission writes the next
    /// scripted log for every input named in the script, an empty script
    /// entry writes nothing. jobs go through the scripted statuses, one per
    /// poll, and are reported gone after the last one. while statuses are
    /// left, logs are held back until the jobs leave the queue
    #[derive(Default)]
    struct Scripted {
        logs: Mutex<HashMap<String, VecDeque<&'static str>>>,
        jobs: Mutex<usize>,
        statuses: Mutex<VecDeque<JobStatus>>,
        held: Mutex<Vec<(PathBuf, &'static str)>>,
    }

    impl Scripted {
        fn new(logs: Vec<(&str, Vec<&'static str>)>) -> Self {
            let logs = logs
                .into_iter()
                .map(|(name, l)| (name.to_owned(), l.into()))
                .collect();
            Self {
                logs: Mutex::new(logs),
                ..Default::default()
            }
        }

        fn with_statuses(self, statuses: Vec<JobStatus>) -> Self {
            *self.statuses.lock().unwrap() = statuses.into();
            self
        }

        fn submissions(&self) -> usize {
            *self.jobs.lock().unwrap()
        }
    }

    impl Queue for Scripted {
        const SCRIPT_EXT: &'static str = "sh";

        fn submit_command(&self) -> &str {
            "true"
        }

        fn template(&self) -> Option<&str> {
            None
        }

        fn default_submit_script(&self) -> String {
            "#!/bin/bash\n".into()
        }

        fn submit(&self, script: &Path) -> Result<String, SubmitError> {
            let dir = script.parent().unwrap();
            let body = std::fs::read_to_string(script).unwrap();
            let mut logs = self.logs.lock().unwrap();
            for name in body.split_whitespace().filter_map(|w| w.strip_suffix(".com"))
            {
                let next = logs.get_mut(name).and_then(|q| q.pop_front());
                if let Some(log) = next
                    && !log.is_empty()
                {
                    let path = dir.join(format!("{name}.log"));
                    if self.statuses.lock().unwrap().is_empty() {
                        std::fs::write(path, log).unwrap();
                    } else {
                        self.held.lock().unwrap().push((path, log));
                    }
                }
            }
            let mut jobs = self.jobs.lock().unwrap();
            *jobs += 1;
            Ok(format!("{}", 1000 + *jobs))
        }

        fn status(&self) -> Result<HashMap<String, JobStatus>, SubmitError> {
            let Some(status) = self.statuses.lock().unwrap().pop_front() else {
                for (path, log) in self.held.lock().unwrap().drain(..) {
                    std::fs::write(path, log).unwrap();
                }
                return Ok(HashMap::new());
            };
            let jobs = *self.jobs.lock().unwrap();
            Ok((1..=jobs).map(|j| (format!("{}", 1000 + j), status)).collect())
        }
    }

    fn config() -> Config {
        Config {
            program: ProgramKind::Gaussian,
            interval: Some(60),
            attempts: 20,
            ..Config::default()
        }
    }

    fn ts(dir: &Path, name: &str) -> Molecule {
        let s = structure![
            C 0.0 0.0 0.0
            H 1.2 0.0 0.0
            O 2.4 0.0 0.0
            H 2.7 0.9 0.0
        ];
        let mut m = Molecule::new(name, dir, s.atoms, 2, Role::TransitionState);
        m.active_site = Some(ActiveSite::new(1, 2, 3));
        m.step = Step::TsOpt;
        m.program = ProgramKind::Gaussian;
        m
    }

    #[test]
    fn mixed_ensemble() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Scripted::new(vec![
            ("m0", vec![TS]),
            ("m1", vec![CONV, CONV, TS]),
            ("m2", vec![INTERVENTION]),
            ("m3", vec![TS]),
            ("m4", vec![TS]),
            ("m5", vec![TS]),
        ]);
        let config = config();
        let clock = VirtualClock::default();
        let mut mols: Vec<_> =
            (0..6).map(|i| ts(dir.path(), &format!("m{i}"))).collect();
        let got = Monitor::new(&queue, &config, &clock)
            .run(&mut mols, "ts")
            .unwrap();
        assert_eq!(got, Outcome::Converged);
        let converged: Vec<_> = mols
            .iter()
            .filter(|m| m.converged)
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(converged, ["m0", "m1", "m3", "m4", "m5"]);
        assert!(mols[2].is_dropped());
        assert_eq!(mols[1].resubmissions, 2);
        assert_eq!(mols[1].error_termination_count, 0);
        let resubmitted: usize = mols.iter().map(|m| m.resubmissions).sum();
        assert_eq!(resubmitted, 2);
        assert_eq!(queue.submissions(), 3);
        assert!(dir.path().join("m1_redo1.log").exists());
        assert!(dir.path().join("m1_redo2.log").exists());
        approx::assert_abs_diff_eq!(
            mols[0].imaginary().unwrap(),
            -1523.4567,
            epsilon = 1e-4
        );
        assert!(mols[0].partition_function.is_some());
    }

    #[test]
    fn missing_log() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Scripted::new(vec![("m0", vec!["", TS])]);
        let config = config();
        let clock = VirtualClock::default();
        let mut mols = vec![ts(dir.path(), "m0")];
        let got = Monitor::new(&queue, &config, &clock)
            .run(&mut mols, "ts")
            .unwrap();
        assert_eq!(got, Outcome::Converged);
        assert_eq!(mols[0].resubmissions, 1);
        // initial delay, the retries for the missing log, one poll interval
        let want = Duration::from_secs(180)
            + LOG_BACKOFF * (LOG_RETRIES as u32 - 1)
            + Duration::from_secs(60);
        assert_eq!(clock.elapsed(), want);
    }

    #[test]
    fn repeated_failures_drop() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Scripted::new(vec![("m0", vec![CONV, CONV, CONV])]);
        let config = config();
        let clock = VirtualClock::default();
        let mut mols = vec![ts(dir.path(), "m0")];
        let got = Monitor::new(&queue, &config, &clock)
            .run(&mut mols, "ts")
            .unwrap();
        assert_eq!(got, Outcome::AllDropped);
        assert_eq!(mols[0].error_termination_count, MAX_ERRORS);
        assert_eq!(mols[0].resubmissions, 2);
    }

    #[test]
    fn abandoned_job() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Scripted::new(vec![("m0", vec![UNFINISHED, TS])]);
        let config = config();
        let clock = VirtualClock::default();
        let mut mols = vec![ts(dir.path(), "m0")];
        let got = Monitor::new(&queue, &config, &clock)
            .run(&mut mols, "ts")
            .unwrap();
        assert_eq!(got, Outcome::Converged);
        assert_eq!(mols[0].resubmissions, 1);
    }

    #[test]
    fn runs_out_of_polls() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Scripted::new(vec![("m0", vec![UNFINISHED])]);
        let config = Config {
            attempts: 3,
            ..config()
        };
        let clock = VirtualClock::default();
        let mut mols = vec![ts(dir.path(), "m0")];
        let got = Monitor::new(&queue, &config, &clock)
            .run(&mut mols, "ts")
            .unwrap();
        assert_eq!(got, Outcome::TimedOut);
        assert!(!mols[0].is_terminal());
    }

    #[test]
    fn rejected_saddle_point() {
        let dir = tempfile::tempdir().unwrap();
        // the same log with every frequency made real
        let real = TS.replace("-1523.4567", " 1523.4567");
        let real: &'static str = Box::leak(real.into_boxed_str());
        let queue = Scripted::new(vec![("m0", vec![real, TS])]);
        let config = config();
        let clock = VirtualClock::default();
        let mut mols = vec![ts(dir.path(), "m0")];
        let got = Monitor::new(&queue, &config, &clock)
            .run(&mut mols, "ts")
            .unwrap();
        assert_eq!(got, Outcome::Converged);
        assert_eq!(mols[0].resubmissions, 1);
    }

    #[test]
    fn queued_then_running() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Scripted::new(vec![("m0", vec![TS])]).with_statuses(vec![
            JobStatus::Pending,
            JobStatus::Pending,
            JobStatus::Running,
        ]);
        // the pending polls must not use up either attempt
        let config = Config {
            attempts: 2,
            ..config()
        };
        let clock = VirtualClock::default();
        let mut mols = vec![ts(dir.path(), "m0")];
        let got = Monitor::new(&queue, &config, &clock)
            .run(&mut mols, "ts")
            .unwrap();
        assert_eq!(got, Outcome::Converged);
        assert!(mols[0].converged);
        assert_eq!(mols[0].resubmissions, 0);
        assert_eq!(mols[0].error_termination_count, 0);
        assert_eq!(queue.submissions(), 1);
        // initial delay, two pending waits, and one interval after the
        // running poll found no log
        let want = Duration::from_secs(180)
            + Duration::from_secs(60) * PENDING_FACTOR * 2
            + Duration::from_secs(60);
        assert_eq!(clock.elapsed(), want);
    }

    #[test]
    fn running_without_log_waits() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Scripted::new(vec![("m0", vec![TS])])
            .with_statuses(vec![JobStatus::Running; 4]);
        let config = Config {
            attempts: 3,
            ..config()
        };
        let clock = VirtualClock::default();
        let mut mols = vec![ts(dir.path(), "m0")];
        let got = Monitor::new(&queue, &config, &clock)
            .run(&mut mols, "ts")
            .unwrap();
        // a running job with no log is neither an error nor finished
        assert_eq!(got, Outcome::TimedOut);
        assert_eq!(mols[0].status, JobStatus::Running);
        assert_eq!(mols[0].error_termination_count, 0);
        assert_eq!(queue.submissions(), 1);
        // no log retries while the job is running
        let want = Duration::from_secs(180) + Duration::from_secs(60) * 3;
        assert_eq!(clock.elapsed(), want);
    }

    #[test]
    fn other_errors_restart_from_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, config, clock) =
            (Scripted::default(), config(), VirtualClock::default());
        let monitor = Monitor::new(&queue, &config, &clock);
        let mut mol = ts(dir.path(), "m0");
        let got = monitor.check(
            &mut mol,
            Ok(Some(OTHER.to_owned())),
            None,
            &mut Track::default(),
        );
        assert_eq!(got, Verdict::Resubmit);
        assert_eq!(mol.error_termination_count, 1);
        approx::assert_abs_diff_eq!(mol.atoms()[1].x, 1.3, epsilon = 1e-8);
        approx::assert_abs_diff_eq!(mol.atoms()[3].y, 0.95, epsilon = 1e-8);

        // without a geometry in the log the old one is kept
        let mut mol = ts(dir.path(), "m1");
        let before = mol.atoms().to_vec();
        let got = monitor.check(
            &mut mol,
            Ok(Some(CONV.to_owned())),
            None,
            &mut Track::default(),
        );
        assert_eq!(got, Verdict::Resubmit);
        assert_eq!(mol.atoms(), &before[..]);
    }
}
