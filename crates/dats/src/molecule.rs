use std::path::PathBuf;

use geom::{ActiveSite, Atom, SiteError, Structure, structure};
use kinetics::{Species, Thermo};
use qcjobs::{
    Calculation, JobStatus, LogSummary, Procedure, ProgramKind,
    program::most_negative,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::DatsError,
    step::{Step, next_step},
};

/// the number of error terminations after which a molecule is dropped
pub const MAX_ERRORS: usize = 3;

/// The part a molecule plays in the reaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Reactant,
    Product,
    TransitionState,
}

/// The small species whose energies complete the reactant and product sides
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reference {
    Oh,
    H2o,
}

impl Reference {
    pub fn name(&self) -> &'static str {
        match self {
            Reference::Oh => "OH",
            Reference::H2o => "H2O",
        }
    }

    pub fn structure(&self) -> Structure {
        match self {
            Reference::Oh => structure![
                O 0.0 0.0 0.0
                H 0.0 0.0 0.97
            ],
            Reference::H2o => structure![
                O 0.0 0.0 0.1173
                H 0.0 0.7572 -0.4692
                H 0.0 -0.7572 -0.4692
            ],
        }
    }

    pub fn mult(&self) -> usize {
        match self {
            Reference::Oh => 2,
            Reference::H2o => 1,
        }
    }

    /// the role the reference plays next to the organic species
    pub fn role(&self) -> Role {
        match self {
            Reference::Oh => Role::Reactant,
            Reference::H2o => Role::Product,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    pub name: String,
    /// where the input, log, and submit files of this molecule live
    pub directory: PathBuf,
    atoms: Vec<Atom>,
    pub charge: isize,
    pub mult: usize,
    pub active_site: Option<ActiveSite>,
    pub role: Role,
    pub reference: Option<Reference>,
    /// the abstraction site number, the `k` in `_H<k>`
    pub site: Option<usize>,

    pub step: Step,
    pub converged: bool,
    pub error_termination_count: usize,
    pub job_id: Option<String>,
    pub status: JobStatus,
    pub program: ProgramKind,
    pub log_file: Option<PathBuf>,
    pub resubmissions: usize,

    pub electronic_energy: Option<f64>,
    pub zero_point_corrected: Option<f64>,
    pub single_point: Option<f64>,
    /// frequencies in cm⁻¹ in the order the program printed them
    pub frequencies: Vec<f64>,
    pub imaginary_mode: Option<Vec<[f64; 3]>>,
    pub thermo: Option<Thermo>,
    pub partition_function: Option<f64>,
}

impl Molecule {
    pub fn new(
        name: impl Into<String>,
        directory: impl Into<PathBuf>,
        atoms: Vec<Atom>,
        mult: usize,
        role: Role,
    ) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            atoms,
            charge: 0,
            mult,
            active_site: None,
            role,
            reference: None,
            site: None,
            step: Step::Init,
            converged: false,
            error_termination_count: 0,
            job_id: None,
            status: JobStatus::Pending,
            program: ProgramKind::default(),
            log_file: None,
            resubmissions: 0,
            electronic_energy: None,
            zero_point_corrected: None,
            single_point: None,
            frequencies: Vec::new(),
            imaginary_mode: None,
            thermo: None,
            partition_function: None,
        }
    }

    /// a reference species in `dir`, ready for its optimization with
    /// `program`
    pub fn reference(
        kind: Reference,
        dir: impl Into<PathBuf>,
        program: ProgramKind,
    ) -> Self {
        let mut ret = Self::new(
            kind.name(),
            dir,
            kind.structure().atoms,
            kind.mult(),
            kind.role(),
        );
        ret.reference = Some(kind);
        ret.set_step(Step::Optimization, program);
        ret
    }

    /// conformer `n` of `template` with the geometry in `atoms`. the
    /// chemistry and step of the template carry over, the job state and
    /// results do not
    pub fn conformer(
        template: &Molecule,
        n: usize,
        atoms: Vec<Atom>,
    ) -> Result<Self, DatsError> {
        let mut ret = Self::new(
            format!("{}_conf{n}", template.base_name()),
            &template.directory,
            template.atoms.clone(),
            template.mult,
            template.role,
        );
        ret.charge = template.charge;
        ret.active_site = template.active_site;
        ret.reference = template.reference;
        ret.site = template.site;
        ret.step = template.step;
        ret.program = template.program;
        ret.set_atoms(atoms)?;
        Ok(ret)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn structure(&self) -> Structure {
        Structure::new(self.atoms.clone())
    }

    /// replace the geometry. the new geometry must have as many atoms as the
    /// old one and keep the elements at the active site
    pub fn set_atoms(&mut self, atoms: Vec<Atom>) -> Result<(), DatsError> {
        let new = Structure::new(atoms);
        let check = match self.active_site {
            Some(site) => site.check_replacement(&self.structure(), &new),
            None if new.len() != self.atoms.len() => Err(SiteError::Length {
                want: self.atoms.len(),
                got: new.len(),
            }),
            None => Ok(()),
        };
        check.map_err(|e| DatsError::Geometry(self.name.clone(), e))?;
        self.atoms = new.atoms;
        Ok(())
    }

    /// the name without any step suffix
    pub fn base_name(&self) -> &str {
        let mut name = self.name.as_str();
        while let Some(s) = Step::SUFFIXES.iter().find_map(|s| name.strip_suffix(s))
        {
            name = s;
        }
        name
    }

    /// move to `step`, renaming the molecule with the step's suffix and
    /// picking the program that runs it. single points always run in ORCA
    /// and conformer sampling in CREST, everything else in `program`
    pub fn set_step(&mut self, step: Step, program: ProgramKind) {
        self.name = format!("{}{}", self.base_name(), step.suffix());
        self.program = match step {
            Step::ConformerSampling => ProgramKind::Crest,
            Step::SinglePoint => ProgramKind::Orca,
            _ => program,
        };
        self.step = step;
        self.converged = false;
        self.job_id = None;
        self.log_file = None;
        self.status = JobStatus::Pending;
    }

    /// move to the step after the current one
    pub fn advance(&mut self, config: &Config) {
        let next = next_step(self.step, self.role, config.skip_low);
        self.set_step(next, config.program);
    }

    /// count an error termination. returns true if this drops the molecule
    pub fn record_error(&mut self) -> bool {
        self.error_termination_count += 1;
        self.is_dropped()
    }

    /// drop the molecule regardless of its count
    pub fn drop_now(&mut self) {
        self.error_termination_count =
            self.error_termination_count.max(MAX_ERRORS);
    }

    pub fn mark_converged(&mut self) {
        self.converged = true;
        self.error_termination_count = 0;
    }

    pub fn is_dropped(&self) -> bool {
        self.error_termination_count >= MAX_ERRORS
    }

    /// whether the monitor is done with this molecule for the current step
    pub fn is_terminal(&self) -> bool {
        self.converged || self.is_dropped() || self.step == Step::Done
    }

    /// the log file the current job writes
    pub fn log_path(&self) -> PathBuf {
        self.program.program().logfile(&self.directory, &self.name)
    }

    /// the most negative frequency, if any
    pub fn imaginary(&self) -> Option<f64> {
        most_negative(&self.frequencies).map(|(_, f)| f)
    }

    /// store the results of a finished job for `proc`. the partition function
    /// is evaluated at `temperature`
    pub fn apply_summary(
        &mut self,
        summary: LogSummary,
        proc: Procedure,
        temperature: f64,
    ) -> Result<(), DatsError> {
        if proc == Procedure::SinglePt {
            self.single_point = summary.electronic_energy;
            return Ok(());
        }
        if let Some(atoms) = summary.atoms {
            self.set_atoms(atoms)?;
        }
        if summary.electronic_energy.is_some() {
            self.electronic_energy = summary.electronic_energy;
        }
        if !proc.has_freq() {
            return Ok(());
        }
        self.zero_point_corrected = summary.zero_point_corrected;
        self.frequencies = summary.frequencies;
        self.imaginary_mode = summary.imaginary_mode;
        let s = self.structure();
        let rotational_constants = summary.rotational_constants.unwrap_or_else(|| {
            let mut ret = [0.0; 3];
            for (r, b) in ret.iter_mut().zip(s.rotational_constants()) {
                *r = b;
            }
            ret
        });
        let thermo = Thermo {
            frequencies: self.frequencies.clone(),
            rotational_constants,
            symmetry_number: summary.symmetry_number.unwrap_or(1),
            mass: summary.mass.unwrap_or_else(|| s.mass()),
            multiplicity: summary.multiplicity.unwrap_or(self.mult),
        };
        self.partition_function = Some(thermo.partition_function(temperature));
        self.thermo = Some(thermo);
        Ok(())
    }

    /// the energy used in the rate expression: the zero-point corrected
    /// energy, with the electronic part replaced by the single point when
    /// there is one
    pub fn rate_energy(&self) -> Option<f64> {
        match (self.single_point, self.zero_point_corrected, self.electronic_energy)
        {
            (Some(sp), Some(zpc), Some(e)) => Some(sp + (zpc - e)),
            (_, Some(zpc), _) => Some(zpc),
            (sp, None, e) => sp.or(e),
        }
    }

    /// the molecule as seen by the rate expression, None without an energy
    pub fn to_species(&self) -> Option<Species> {
        let energy = self.rate_energy()?;
        Some(Species {
            imaginary: self.imaginary(),
            ..Species::new(&self.name, energy, self.partition_function.unwrap_or(1.0))
        })
    }

    /// the input description for the current step. `attempt` escalates the
    /// convergence settings
    pub fn calculation(
        &self,
        config: &Config,
        attempt: usize,
    ) -> Result<Calculation, DatsError> {
        let procedure = self.step.procedure().ok_or_else(|| {
            DatsError::Configuration(format!(
                "{} has nothing to run at step {}",
                self.name, self.step
            ))
        })?;
        let (method, basis) = match procedure {
            Procedure::ConstrainedOpt => (&config.low_method, &config.low_basis),
            _ => (&config.method, &config.basis),
        };
        let active_site = match self.role {
            Role::TransitionState => self.active_site,
            _ => None,
        };
        Ok(Calculation {
            name: self.name.clone(),
            procedure,
            atoms: self.atoms.clone(),
            charge: self.charge,
            mult: self.mult,
            active_site,
            method: method.clone(),
            basis: basis.clone(),
            scf: config.scf.clone(),
            cpu: config.cpu,
            mem: config.mem,
            attempt,
            gfn: config.gfn,
            ewin: config.ewin,
        })
    }
}
