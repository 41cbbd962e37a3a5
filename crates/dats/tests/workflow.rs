use std::{collections::HashMap, path::Path, sync::Mutex};

use dats::{
    Config, Ensemble, Finals, Molecule, Role, Step, Workflow, collection,
    molecule::Reference,
    monitor::VirtualClock,
    workflow::{Kind, rate_table},
};
use geom::{ActiveSite, Structure};
use qcjobs::{JobStatus, ProgramKind, Queue, SubmitError};

const GAUSSIAN_TS: &str = include_str!("../testfiles/ts.log");
const ORCA_SP: &str = include_str!("../testfiles/ts.out");

/// a queue that finishes every job the moment it is submitted
#[derive(Default)]
struct Instant {
    submitted: Mutex<Vec<String>>,
}

impl Queue for Instant {
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
        for word in body.split_whitespace() {
            if let Some(name) = word.strip_suffix(".com") {
                std::fs::write(dir.join(format!("{name}.log")), GAUSSIAN_TS)
                    .unwrap();
            } else if let Some(name) = word.strip_suffix(".inp") {
                std::fs::write(dir.join(format!("{name}.out")), ORCA_SP)
                    .unwrap();
            }
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(script.display().to_string());
        Ok(format!("{}", 2000 + submitted.len()))
    }

    fn status(&self) -> Result<HashMap<String, JobStatus>, SubmitError> {
        Ok(HashMap::new())
    }
}

fn config() -> Config {
    Config {
        program: ProgramKind::Gaussian,
        interval: Some(60),
        ..Config::default()
    }
}

/// a transition-state ensemble resuming from its saved TS_opt collection
fn saddle_points(root: &Path) -> Ensemble {
    let dir = root.join("ch3oh_H1");
    std::fs::create_dir_all(&dir).unwrap();
    let s: Structure = "4\n\nC 0.0 0.0 0.0\nH 1.25 0.0 0.0\nO 2.5 0.0 0.0\nH 2.75 0.94 0.0\n"
        .parse()
        .unwrap();
    let mut mol = Molecule::new(
        "ch3oh_H1_conf1",
        &dir,
        s.atoms,
        2,
        Role::TransitionState,
    );
    mol.active_site = Some(ActiveSite::new(1, 2, 3));
    mol.site = Some(1);
    mol.set_step(Step::TsOpt, ProgramKind::Gaussian);
    let path = collection::step_file(&dir, "ch3oh_H1", Step::TsOpt);
    collection::save(&path, &[mol]).unwrap();
    Ensemble::load(&path).unwrap()
}

fn reference(name: &str, role: Role, energy: f64) -> Molecule {
    let s = Reference::H2o.structure();
    let mut m = Molecule::new(name, "/tmp", s.atoms, 1, role);
    m.step = Step::Done;
    m.converged = true;
    m.zero_point_corrected = Some(energy);
    m.partition_function = Some(1.0);
    m
}

/// the reactant and OH collection of a run that already finished them
fn finished_reactants(root: &Path) {
    let mut oh = reference("OH_DLPNO", Role::Reactant, -75.70);
    oh.reference = Some(Reference::Oh);
    let mols = [reference("ch3oh_conf1_DLPNO", Role::Reactant, -39.78), oh];
    collection::save(&root.join("Final_reactants_ch3oh.json"), &mols).unwrap();
}

#[test]
fn saddle_point_to_rate() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    finished_reactants(root);
    let ens = saddle_points(root);
    assert_eq!(ens.kind, Kind::TransitionStates { site: 1 });
    assert_eq!(ens.base, "ch3oh");
    assert_eq!(ens.name, "ch3oh_H1");

    let (queue, clock, config) =
        (Instant::default(), VirtualClock::default(), config());
    let wf = Workflow::new(&queue, &config, &clock, root);
    let finals = wf.execute(vec![ens]).unwrap();

    // one saddle-point search and one single point
    assert_eq!(queue.submitted.lock().unwrap().len(), 2);
    let ts_dir = root.join("ch3oh_H1");
    assert!(ts_dir.join("ch3oh_H1_conf1_TS.log").exists());
    assert!(ts_dir.join("ch3oh_H1_conf1_DLPNO.out").exists());
    assert!(ts_dir.join("ch3oh_H1_TS_opt.json").exists());
    assert!(ts_dir.join("ch3oh_H1_DLPNO.json").exists());
    assert!(root.join("Final_TS_ch3oh_H1.json").exists());

    let f = &finals["ch3oh"];
    let ts = &f.transition_states["H1"];
    assert_eq!(ts.len(), 1);
    assert_eq!(ts[0].step, Step::Done);
    assert_eq!(ts[0].imaginary(), Some(-1523.4567));
    approx::assert_abs_diff_eq!(
        ts[0].single_point.unwrap(),
        -115.5034568,
        epsilon = 1e-6
    );

    let on_disk = Finals::discover(root).unwrap();
    let saved = &on_disk["ch3oh"];
    assert_eq!(saved.reactants.len(), 1);
    assert!(saved.oh.is_some());
    assert_eq!(saved.transition_states["H1"][0].name, ts[0].name);

    let channels = f.rates(config.temperature);
    assert_eq!(channels.len(), 1);
    let rate = channels[0].rate.as_ref().unwrap();
    assert!(rate.k > 0.0 && rate.k.is_finite());
    assert!(rate.kappa >= 1.0);
    assert!(rate.barrier > 0.0);
    let table = rate_table("ch3oh", &channels);
    assert!(table.contains("ch3oh_H1"));
}

#[test]
fn finished_channels_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    finished_reactants(root);
    let ens = saddle_points(root);
    let (queue, clock, config) =
        (Instant::default(), VirtualClock::default(), config());
    let wf = Workflow::new(&queue, &config, &clock, root);
    wf.execute(vec![ens.clone()]).unwrap();
    assert_eq!(queue.submitted.lock().unwrap().len(), 2);

    let again = wf.execute(vec![ens]).unwrap();
    assert_eq!(queue.submitted.lock().unwrap().len(), 2);
    assert_eq!(again["ch3oh"].transition_states["H1"].len(), 1);
}
