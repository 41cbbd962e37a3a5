//! Driving ensembles through their steps. Each ensemble runs one step at a
//! time on its own thread and reports back to the driver, which starts the
//! next step, the reference species, and finally writes the collections the
//! rate constants are computed from.

use std::{
    collections::{BTreeMap, HashSet},
    fmt::Write,
    path::{Path, PathBuf},
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread,
    time::Duration,
};

use geom::Structure;
use kinetics::{RateInput, RateResult, Species, rate_constant};
use qcjobs::{Queue, program::Crest};

use crate::{
    collection,
    config::Config,
    construct::{Reaction, construct},
    error::DatsError,
    filter::filter,
    molecule::{Molecule, Reference, Role},
    monitor::{Clock, Monitor, Outcome},
    step::Step,
};

pub const REACTANTS_DIR: &str = "reactants";
pub const PRODUCTS_DIR: &str = "products";

/// how long the driver waits on its channel before checking for finished
/// threads
const JOIN_POLL: Duration = Duration::from_millis(200);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Reactants,
    /// the radicals left behind at every abstraction site
    Products,
    TransitionStates {
        site: usize,
    },
    Reference(Reference),
}

/// Molecules that share a directory and a step
#[derive(Clone, Debug, PartialEq)]
pub struct Ensemble {
    pub kind: Kind,
    /// the input structure the ensemble descends from
    pub base: String,
    /// prefix of the job and collection names
    pub name: String,
    pub dir: PathBuf,
    pub molecules: Vec<Molecule>,
}

impl Ensemble {
    /// the step of the ensemble, taken from its first molecule
    pub fn step(&self) -> Step {
        self.molecules.first().map_or(Step::Done, |m| m.step)
    }

    /// a fresh ensemble holding the reference species `r` in `dir`
    pub fn reference(r: Reference, dir: &Path, config: &Config) -> Self {
        let mol = Molecule::reference(r, dir, config.program);
        Self {
            kind: Kind::Reference(r),
            base: r.name().to_owned(),
            name: r.name().to_owned(),
            dir: dir.to_path_buf(),
            molecules: vec![mol],
        }
    }

    /// load the ensemble saved in the collection at `path`. the name of the
    /// ensemble is the file name without its step label
    pub fn load(path: &Path) -> Result<Self, DatsError> {
        let molecules = collection::load(path)?;
        let Some(first) = molecules.first() else {
            return Err(DatsError::Configuration(format!(
                "{} holds no molecules",
                path.display()
            )));
        };
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let name = stem
            .strip_suffix(first.step.label())
            .and_then(|s| s.strip_suffix('_'))
            .unwrap_or(stem)
            .to_owned();
        let (kind, base) = match (first.reference, first.role) {
            (Some(r), _) => (Kind::Reference(r), r.name().to_owned()),
            (None, Role::Reactant) => (
                Kind::Reactants,
                name.strip_suffix("_reactant").unwrap_or(&name).to_owned(),
            ),
            (None, Role::Product) => (
                Kind::Products,
                name.strip_suffix("_products").unwrap_or(&name).to_owned(),
            ),
            (None, Role::TransitionState) => (
                Kind::TransitionStates {
                    site: first.site.unwrap_or(1),
                },
                name.rsplit_once('_').map_or(name.as_str(), |(b, _)| b).to_owned(),
            ),
        };
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        log::info!(
            "loaded {} molecules of {name} at {} from {}",
            molecules.len(),
            first.step,
            path.display()
        );
        Ok(Self {
            kind,
            base,
            name,
            dir,
            molecules,
        })
    }

    fn save(&self, step: Step) -> Result<(), DatsError> {
        let path = collection::step_file(&self.dir, &self.name, step);
        collection::save(&path, &self.molecules)
    }
}

/// Messages from ensemble threads to the driver. every thread sends exactly
/// one
#[derive(Debug)]
enum Event {
    /// the ensemble finished a step and is ready for the next one
    Spawn(Ensemble),
    /// the ensemble is done or stopped
    Finished(Ensemble),
    Failed(String, DatsError),
}

/// spin multiplicity of the lowest state of `s` with `charge`
pub fn multiplicity(s: &Structure, charge: isize) -> usize {
    let electrons: isize =
        s.atoms.iter().map(|a| a.atomic_number as isize).sum::<isize>() - charge;
    if electrons % 2 == 0 { 1 } else { 2 }
}

fn create_dir(dir: &Path) -> Result<(), DatsError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| DatsError::Io(dir.display().to_string(), e.kind()))
}

fn read_structure(path: &Path) -> Result<Structure, DatsError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| DatsError::Io(path.display().to_string(), e.kind()))?;
    contents.parse().map_err(|e| {
        DatsError::Configuration(format!("{}: {e}", path.display()))
    })
}

pub struct Workflow<'a, Q: Queue, C: Clock> {
    queue: &'a Q,
    config: &'a Config,
    clock: &'a C,
    root: PathBuf,
    journal: Option<Sender<String>>,
}

impl<'a, Q: Queue, C: Clock> Workflow<'a, Q, C> {
    pub fn new(
        queue: &'a Q,
        config: &'a Config,
        clock: &'a C,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            queue,
            config,
            clock,
            root: root.into(),
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Option<Sender<String>>) -> Self {
        self.journal = journal;
        self
    }

    fn note(&self, msg: String) {
        if let Some(tx) = &self.journal {
            let _ = tx.send(msg);
        }
    }

    /// build the starting ensembles for the structure in `input`: one
    /// directory per transition-state candidate, plus the reactant and the
    /// abstraction products when they are requested. every ensemble is
    /// saved as its `init` collection
    pub fn initialize(&self, input: &Path) -> Result<Vec<Ensemble>, DatsError> {
        let config = self.config;
        let s = read_structure(input)?;
        let base = input
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                DatsError::Configuration(format!(
                    "bad input name {}",
                    input.display()
                ))
            })?
            .to_owned();
        let partner = match &config.partner {
            Some(p) => Some(read_structure(Path::new(p))?),
            None => None,
        };
        let candidates = construct(&s, config.reaction, partner.as_ref())?;
        if candidates.is_empty() {
            log::warn!("no {} sites found in {}", config.reaction, input.display());
        }
        if let Some(site) = config.cho
            && config.transition_states
        {
            for c in &candidates {
                let natoms = c.structure.atoms.len();
                if site.indices().iter().any(|&i| i > natoms) {
                    return Err(DatsError::Configuration(format!(
                        "CHO {site} is out of range for the {natoms} atoms \
                         of the {base} candidates"
                    )));
                }
            }
        }

        let mut ret = Vec::new();
        if config.transition_states {
            for c in &candidates {
                let name = format!("{base}_{}", config.reaction.label(c.index));
                let dir = self.root.join(&name);
                create_dir(&dir)?;
                let xyz = dir.join(format!("{name}.xyz"));
                std::fs::write(&xyz, c.structure.to_string()).map_err(|e| {
                    DatsError::Io(xyz.display().to_string(), e.kind())
                })?;
                let mut mol = Molecule::new(
                    &name,
                    &dir,
                    c.structure.atoms.clone(),
                    multiplicity(&c.structure, config.charge),
                    Role::TransitionState,
                );
                mol.charge = config.charge;
                mol.active_site = Some(config.cho.unwrap_or(c.site));
                mol.site = Some(c.index);
                ret.push(Ensemble {
                    kind: Kind::TransitionStates { site: c.index },
                    base: base.clone(),
                    name,
                    dir,
                    molecules: vec![mol],
                });
            }
        }

        if config.reactants {
            let dir = self.root.join(REACTANTS_DIR);
            create_dir(&dir)?;
            let name = format!("{base}_reactant");
            let mut mol = Molecule::new(
                &name,
                &dir,
                s.atoms.clone(),
                multiplicity(&s, config.charge),
                Role::Reactant,
            );
            mol.charge = config.charge;
            ret.push(Ensemble {
                kind: Kind::Reactants,
                base: base.clone(),
                name,
                dir,
                molecules: vec![mol],
            });
        }

        let products: Vec<_> = candidates
            .iter()
            .filter_map(|c| c.product.as_ref().map(|p| (c.index, p)))
            .collect();
        if config.products && !products.is_empty() {
            let dir = self.root.join(PRODUCTS_DIR);
            create_dir(&dir)?;
            let molecules = products
                .into_iter()
                .map(|(k, p)| {
                    let mut mol = Molecule::new(
                        format!("{base}_product_{}", config.reaction.label(k)),
                        &dir,
                        p.atoms.clone(),
                        multiplicity(p, config.charge),
                        Role::Product,
                    );
                    mol.charge = config.charge;
                    mol.site = Some(k);
                    mol
                })
                .collect();
            ret.push(Ensemble {
                kind: Kind::Products,
                name: format!("{base}_products"),
                base,
                dir,
                molecules,
            });
        }

        for ens in &ret {
            ens.save(Step::Init)?;
        }
        log::info!("initialized {} ensembles from {}", ret.len(), input.display());
        Ok(ret)
    }

    /// read the conformers CREST found for each of `parents`
    fn expand(&self, parents: Vec<Molecule>) -> Vec<Molecule> {
        let mut ret = Vec::new();
        for p in parents {
            let frames = match Crest::read_conformers(
                &p.directory,
                &p.name,
                self.config.max_conformers,
            ) {
                Ok(f) => f,
                Err(e) => {
                    self.note(format!("no conformers for {}: {e}", p.name));
                    log::warn!("no conformers for {}: {e}", p.name);
                    continue;
                }
            };
            for (n, s) in frames.into_iter().enumerate() {
                match Molecule::conformer(&p, n + 1, s.atoms) {
                    Ok(m) => ret.push(m),
                    Err(e) => log::warn!("skipping conformer {}: {e}", n + 1),
                }
            }
        }
        ret
    }

    /// run the current step of `ens` and move its survivors to the next one.
    /// an ensemble whose molecules all converged already, as when resuming
    /// from a collection, goes straight to advancing
    fn run_step(&self, mut ens: Ensemble) -> Result<Ensemble, DatsError> {
        let step = ens.step();
        match step {
            Step::Done => return Ok(ens),
            Step::Init => {
                for mol in &mut ens.molecules {
                    mol.advance(self.config);
                }
                return Ok(ens);
            }
            _ => {}
        }

        let name = format!("{}_{}", ens.name, step.label());
        if !ens.molecules.iter().all(|m| m.converged) {
            let outcome = Monitor::new(self.queue, self.config, self.clock)
                .with_journal(self.journal.clone())
                .run(&mut ens.molecules, &name)?;
            if outcome != Outcome::Converged {
                self.note(format!("{name} ended with {outcome:?}"));
                return Err(DatsError::Convergence(name));
            }
        }
        ens.molecules.retain(|m| m.converged);
        ens.save(step)?;

        let mut mols = std::mem::take(&mut ens.molecules);
        if step == Step::ConformerSampling {
            mols = self.expand(mols);
            if mols.is_empty() {
                return Err(DatsError::Convergence(name));
            }
            log::info!("{name} gave {} conformers", mols.len());
        }
        for mol in &mut mols {
            mol.advance(self.config);
        }
        if mols.first().is_some_and(|m| m.step == self.config.filter_step) {
            mols = filter(mols, self.config);
        }
        ens.molecules = mols;
        Ok(ens)
    }

    fn process(&self, ens: Ensemble) -> Event {
        let name = ens.name.clone();
        match self.run_step(ens) {
            Ok(ens) if ens.step() == Step::Done || !self.config.auto => {
                Event::Finished(ens)
            }
            Ok(ens) => Event::Spawn(ens),
            Err(e) => Event::Failed(name, e),
        }
    }

    /// run every ensemble until it is done or fails. the OH reference is
    /// started once, after the first reactant ensemble is done, and the H2O
    /// reference after the first product ensemble, unless they are in
    /// `have` already. returns the finished ensembles
    pub fn run(&self, ensembles: Vec<Ensemble>, have: &[Reference]) -> Vec<Ensemble> {
        let (tx, rx) = mpsc::channel();
        let mut started: HashSet<Reference> = have.iter().copied().collect();
        for ens in &ensembles {
            if let Kind::Reference(r) = ens.kind {
                started.insert(r);
            }
        }
        let mut finished = Vec::new();
        thread::scope(|s| {
            let spawn = |ens: Ensemble| {
                let tx = tx.clone();
                log::info!("starting {} at {}", ens.name, ens.step());
                s.spawn(move || {
                    let event = self.process(ens);
                    let _ = tx.send(event);
                })
            };
            let mut outstanding = ensembles.len();
            let mut handles: Vec<_> = ensembles.into_iter().map(&spawn).collect();
            while outstanding > 0 {
                match rx.recv_timeout(JOIN_POLL) {
                    Ok(Event::Spawn(ens)) => handles.push(spawn(ens)),
                    Ok(Event::Finished(ens)) => {
                        outstanding -= 1;
                        let reference = match ens.kind {
                            Kind::Reactants => Some(Reference::Oh),
                            Kind::Products => Some(Reference::H2o),
                            _ => None,
                        };
                        if let Some(r) = reference
                            && ens.step() == Step::Done
                            && started.insert(r)
                        {
                            outstanding += 1;
                            let r = Ensemble::reference(r, &ens.dir, self.config);
                            handles.push(spawn(r));
                        }
                        log::info!("{} finished at {}", ens.name, ens.step());
                        self.note(format!("{} finished at {}", ens.name, ens.step()));
                        finished.push(ens);
                    }
                    Ok(Event::Failed(name, e)) => {
                        outstanding -= 1;
                        log::error!("{name} failed: {e}");
                        self.note(format!("{name} failed: {e}"));
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                let (done, running): (Vec<_>, Vec<_>) =
                    handles.into_iter().partition(|h| h.is_finished());
                for h in done {
                    // a panicking thread never sends its event
                    if h.join().is_err() {
                        log::error!("ensemble thread panicked");
                        outstanding = outstanding.saturating_sub(1);
                    }
                }
                handles = running;
            }
        });
        finished
    }

    /// run `ensembles` and merge the results into the final collections in
    /// the root directory. ensembles whose final collection exists already
    /// are not run again
    pub fn execute(
        &self,
        ensembles: Vec<Ensemble>,
    ) -> Result<BTreeMap<String, Finals>, DatsError> {
        let mut finals: BTreeMap<String, Finals> = BTreeMap::new();
        let mut to_run = Vec::new();
        for ens in ensembles {
            if !finals.contains_key(&ens.base) {
                let existing = Finals::load(&self.root, &ens.base)?;
                finals.insert(ens.base.clone(), existing);
            }
            let existing = &finals[&ens.base];
            let skip = match ens.kind {
                Kind::Reactants => !existing.reactants.is_empty(),
                Kind::Products => !existing.products.is_empty(),
                Kind::TransitionStates { site } => existing
                    .transition_states
                    .contains_key(&self.config.reaction.label(site)),
                Kind::Reference(_) => false,
            };
            if skip {
                log::info!("{} is already done, skipping", ens.name);
            } else {
                to_run.push(ens);
            }
        }
        let mut have = Vec::new();
        if finals.values().any(|f| f.oh.is_some()) {
            have.push(Reference::Oh);
        }
        if finals.values().any(|f| f.h2o.is_some()) {
            have.push(Reference::H2o);
        }

        let finished = self.run(to_run, &have);

        let (references, rest): (Vec<_>, Vec<_>) = finished
            .into_iter()
            .filter(|e| e.step() == Step::Done)
            .partition(|e| matches!(e.kind, Kind::Reference(_)));
        for ens in rest {
            let f = finals.entry(ens.base.clone()).or_default();
            f.add(ens, self.config.reaction);
        }
        for ens in references {
            for f in finals.values_mut() {
                f.add(ens.clone(), self.config.reaction);
            }
        }
        for (base, f) in &finals {
            f.save(&self.root, base)?;
        }
        Ok(finals)
    }
}

fn species(mols: &[Molecule]) -> Vec<Species> {
    mols.iter().filter_map(Molecule::to_species).collect()
}

/// Everything a rate constant needs for one input structure, keyed by
/// reaction site label
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Finals {
    pub reactants: Vec<Molecule>,
    pub oh: Option<Molecule>,
    pub products: BTreeMap<String, Vec<Molecule>>,
    pub h2o: Option<Molecule>,
    pub transition_states: BTreeMap<String, Vec<Molecule>>,
}

/// the rate constant of one reaction channel
#[derive(Debug)]
pub struct Channel {
    pub label: String,
    pub rate: Result<RateResult, DatsError>,
}

impl Finals {
    fn reactants_file(root: &Path, base: &str) -> PathBuf {
        root.join(format!("Final_reactants_{base}.json"))
    }

    fn products_file(root: &Path, base: &str, label: &str) -> PathBuf {
        root.join(format!("Final_products_{base}_{label}.json"))
    }

    fn ts_file(root: &Path, base: &str, label: &str) -> PathBuf {
        root.join(format!("Final_TS_{base}_{label}.json"))
    }

    /// add the molecules of a finished ensemble
    fn add(&mut self, ens: Ensemble, reaction: Reaction) {
        match ens.kind {
            Kind::Reactants => self.reactants.extend(ens.molecules),
            Kind::Products => {
                for mol in ens.molecules {
                    let label = reaction.label(mol.site.unwrap_or(0));
                    self.products.entry(label).or_default().push(mol);
                }
            }
            Kind::TransitionStates { site } => self
                .transition_states
                .entry(reaction.label(site))
                .or_default()
                .extend(ens.molecules),
            Kind::Reference(r) => {
                let mol = ens.molecules.into_iter().next();
                match r {
                    Reference::Oh => self.oh = mol,
                    Reference::H2o => self.h2o = mol,
                }
            }
        }
    }

    /// split the reference species out of a loaded collection
    fn split(mols: Vec<Molecule>) -> (Vec<Molecule>, Option<Molecule>) {
        let (refs, rest): (Vec<_>, Vec<_>) =
            mols.into_iter().partition(|m| m.reference.is_some());
        (rest, refs.into_iter().next())
    }

    /// read the final collections of `base` that exist in `root`
    pub fn load(root: &Path, base: &str) -> Result<Self, DatsError> {
        let mut ret = Self::default();
        let path = Self::reactants_file(root, base);
        if path.exists() {
            (ret.reactants, ret.oh) = Self::split(collection::load(&path)?);
        }
        let Ok(entries) = std::fs::read_dir(root) else {
            return Ok(ret);
        };
        let products = format!("Final_products_{base}_");
        let ts = format!("Final_TS_{base}_");
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(file) = path.file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            let Some(stem) = file.strip_suffix(".json") else {
                continue;
            };
            // a longer base sharing this prefix has another underscore
            if let Some(label) = stem.strip_prefix(&products)
                && !label.contains('_')
            {
                let (mols, h2o) = Self::split(collection::load(&path)?);
                ret.products.insert(label.to_owned(), mols);
                if h2o.is_some() {
                    ret.h2o = h2o;
                }
            } else if let Some(label) = stem.strip_prefix(&ts)
                && !label.contains('_')
            {
                ret.transition_states
                    .insert(label.to_owned(), collection::load(&path)?);
            }
        }
        Ok(ret)
    }

    /// the final collections in `root`, keyed by input structure
    pub fn discover(root: &Path) -> Result<BTreeMap<String, Self>, DatsError> {
        let entries = std::fs::read_dir(root)
            .map_err(|e| DatsError::Io(root.display().to_string(), e.kind()))?;
        let mut bases = HashSet::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };
            if let Some(base) = stem.strip_prefix("Final_reactants_") {
                bases.insert(base.to_owned());
            } else if let Some((base, _)) = stem
                .strip_prefix("Final_TS_")
                .and_then(|s| s.rsplit_once('_'))
            {
                bases.insert(base.to_owned());
            }
        }
        bases
            .into_iter()
            .map(|base| Ok((base.clone(), Self::load(root, &base)?)))
            .collect()
    }

    /// write the final collections of `base` to `root`. the references are
    /// stored next to the molecules they complete
    pub fn save(&self, root: &Path, base: &str) -> Result<(), DatsError> {
        if !self.reactants.is_empty() {
            let mut mols = self.reactants.clone();
            mols.extend(self.oh.clone());
            collection::save(&Self::reactants_file(root, base), &mols)?;
        }
        for (label, products) in &self.products {
            let mut mols = products.clone();
            mols.extend(self.h2o.clone());
            collection::save(&Self::products_file(root, base, label), &mols)?;
        }
        for (label, ts) in &self.transition_states {
            collection::save(&Self::ts_file(root, base, label), ts)?;
        }
        Ok(())
    }

    /// the rate constant of every channel with converged transition states
    pub fn rates(&self, temperature: f64) -> Vec<Channel> {
        self.transition_states
            .iter()
            .map(|(label, ts)| {
                let input = RateInput {
                    reactants: species(&self.reactants),
                    oh: self.oh.as_ref().and_then(Molecule::to_species),
                    transition_states: species(ts),
                    products: self
                        .products
                        .get(label)
                        .map(|p| species(p))
                        .unwrap_or_default(),
                    h2o: self.h2o.as_ref().and_then(Molecule::to_species),
                    temperature,
                };
                Channel {
                    label: label.clone(),
                    rate: rate_constant(&input).map_err(DatsError::from),
                }
            })
            .collect()
    }
}

/// a table of the channel rate constants of `base` and their sum
pub fn rate_table(base: &str, channels: &[Channel]) -> String {
    let mut ret = String::new();
    writeln!(
        ret,
        "{:<20} {:>14} {:>10} {:>12}",
        "channel", "k", "kappa", "barrier"
    )
    .unwrap();
    let mut total = 0.0;
    for Channel { label, rate } in channels {
        let name = format!("{base}_{label}");
        match rate {
            Ok(r) => {
                total += r.k;
                writeln!(
                    ret,
                    "{name:<20} {:>14.4e} {:>10.4} {:>12.4}",
                    r.k, r.kappa, r.barrier
                )
                .unwrap();
            }
            Err(e) => writeln!(ret, "{name:<20} {e}").unwrap(),
        }
    }
    writeln!(ret, "{:<20} {total:>14.4e}", "total").unwrap();
    ret
}
