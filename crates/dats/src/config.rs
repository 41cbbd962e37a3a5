//! Configuration settings for a DATS run

use std::{fmt::Display, fs::read_to_string, path::Path};

use geom::ActiveSite;
use qcjobs::{ProgramKind, Resources};
use serde::{Deserialize, Serialize};

use crate::{construct::Reaction, error::DatsError, step::Step};

/// Templates can either be literal strings in the config file, or the name of
/// a file to be loaded
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(untagged)]
enum TemplateSrc {
    Literal(String),
    File { file: String },
}

impl TryFrom<TemplateSrc> for String {
    type Error = DatsError;

    fn try_from(value: TemplateSrc) -> Result<Self, Self::Error> {
        match value {
            TemplateSrc::Literal(s) => Ok(s),
            TemplateSrc::File { file } => read_to_string(&file).map_err(|e| {
                DatsError::Configuration(format!(
                    "failed to load template file {file}: {e}"
                ))
            }),
        }
    }
}

#[derive(Default, Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    /// The reaction to build transition states for: "OH" (hydrogen
    /// abstraction by OH), "CC" (addition across a C=C bond), or "OH_CC" (OH
    /// addition to a C=C bond).
    reaction: Option<String>,

    /// The partner structure for "CC" additions, as the name of an XYZ file.
    partner: Option<String>,

    /// The quantum chemistry program for the optimizations. Single points
    /// always run in ORCA and conformer sampling in CREST.
    program: Option<ProgramKind>,

    /// The queuing system: "slurm" or "local".
    queue: Option<QueueKind>,

    /// Method and basis set for optimizations and frequencies.
    method: Option<String>,
    basis: Option<String>,

    /// Method and basis set for the constrained preoptimization.
    low_method: Option<String>,
    low_basis: Option<String>,

    /// Molecular charge of the input structure.
    charge: Option<isize>,

    cpu: Option<usize>,

    /// Memory per job in MB.
    mem: Option<usize>,

    partition: Option<String>,

    /// Wall time per job, in the queue's format.
    time: Option<String>,

    /// Seconds between polls. Derived from the job size when missing.
    interval: Option<u64>,

    /// Seconds to wait before the first poll. Three intervals when missing.
    initial_delay: Option<u64>,

    /// The number of polls before an ensemble is given up on.
    attempts: Option<usize>,

    /// The maximum number of conformers kept from each sampling run.
    max_conformers: Option<usize>,

    /// Imaginary frequencies above this value (in cm⁻¹) need their geometry
    /// checked before they are accepted.
    freq_cutoff: Option<f64>,

    /// Energy window for conformer sampling in kcal/mol.
    ewin: Option<f64>,

    /// GFN-xTB version for conformer sampling.
    gfn: Option<usize>,

    /// Initial energy window in kcal/mol for discarding high conformers.
    energy_cutoff: Option<f64>,

    /// Whether to filter conformers at all.
    filter: Option<bool>,

    /// The step before which conformers are filtered.
    filter_step: Option<Step>,

    /// Aligned RMSD in Å below which two conformers are the same.
    rmsd_threshold: Option<f64>,

    /// Continue to the next step automatically.
    auto: Option<bool>,

    /// Go from conformer sampling straight to the saddle-point search.
    skip_low: Option<bool>,

    /// Temperature in K for partition functions and the rate constant.
    temperature: Option<f64>,

    /// Which ensembles to compute.
    reactants: Option<bool>,
    products: Option<bool>,
    transition_states: Option<bool>,

    /// Active-site override as 1-based C, H, O indices.
    cho: Option<[usize; 3]>,

    /// Extra SCF keyword for the optimizations.
    scf: Option<String>,

    /// The template input file for the queuing system. Supported formatting
    /// directives include {{.basename}}, {{.filename}}, {{.dir}}, {{.cpu}},
    /// {{.mem}}, {{.partition}}, {{.time}}, and {{.array}}.
    queue_template: Option<TemplateSrc>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum QueueKind {
    #[default]
    #[serde(alias = "slurm")]
    Slurm,
    #[serde(alias = "local")]
    Local,
}

impl Display for QueueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                QueueKind::Slurm => "slurm",
                QueueKind::Local => "local",
            }
        )
    }
}

/// Load a full `Config` with [Config::load] or build one from
/// [Config::default]
#[derive(Clone, Serialize, PartialEq, Debug)]
pub struct Config {
    pub reaction: Reaction,
    /// file holding the partner structure of an addition
    pub partner: Option<String>,
    pub program: ProgramKind,
    pub queue: QueueKind,
    pub method: String,
    pub basis: String,
    pub low_method: String,
    pub low_basis: String,
    pub charge: isize,
    pub cpu: usize,
    /// MB
    pub mem: usize,
    pub partition: String,
    pub time: String,
    /// seconds between polls, None to derive it from the job size
    pub interval: Option<u64>,
    pub initial_delay: Option<u64>,
    pub attempts: usize,
    pub max_conformers: usize,
    /// always negative
    pub freq_cutoff: f64,
    pub ewin: f64,
    pub gfn: usize,
    pub energy_cutoff: f64,
    pub filter: bool,
    pub filter_step: Step,
    pub rmsd_threshold: f64,
    pub auto: bool,
    pub skip_low: bool,
    pub temperature: f64,
    pub reactants: bool,
    pub products: bool,
    pub transition_states: bool,
    pub cho: Option<ActiveSite>,
    pub scf: Option<String>,
    /// the template for submit scripts. If this is not provided, the queue's
    /// implementation of [qcjobs::Queue::default_submit_script] is used
    pub queue_template: Option<String>,
}

impl TryFrom<RawConfig> for Config {
    type Error = DatsError;

    fn try_from(rc: RawConfig) -> Result<Self, Self::Error> {
        let reaction = rc
            .reaction
            .as_deref()
            .unwrap_or("OH")
            .parse()
            .map_err(DatsError::Configuration)?;
        let res = Resources::default();
        let method = rc.method.unwrap_or_else(|| "wb97xd".to_owned());
        let basis = rc.basis.unwrap_or_else(|| "6-31++g(d,p)".to_owned());
        let ret = Self {
            reaction,
            partner: rc.partner,
            program: rc.program.unwrap_or(ProgramKind::Gaussian),
            queue: rc.queue.unwrap_or_default(),
            low_method: rc.low_method.unwrap_or_else(|| method.clone()),
            low_basis: rc.low_basis.unwrap_or_else(|| "6-31+g(d,p)".to_owned()),
            method,
            basis,
            charge: rc.charge.unwrap_or(0),
            cpu: rc.cpu.unwrap_or(res.cpu),
            mem: rc.mem.unwrap_or(res.mem),
            partition: rc.partition.unwrap_or(res.partition),
            time: rc.time.unwrap_or(res.time),
            interval: rc.interval,
            initial_delay: rc.initial_delay,
            attempts: rc.attempts.unwrap_or(100),
            max_conformers: rc.max_conformers.unwrap_or(50),
            freq_cutoff: -rc.freq_cutoff.unwrap_or(120.0).abs(),
            ewin: rc.ewin.unwrap_or(8.0),
            gfn: rc.gfn.unwrap_or(2),
            energy_cutoff: rc.energy_cutoff.unwrap_or(5.0),
            filter: rc.filter.unwrap_or(true),
            filter_step: rc.filter_step.unwrap_or(Step::SinglePoint),
            rmsd_threshold: rc.rmsd_threshold.unwrap_or(0.38),
            auto: rc.auto.unwrap_or(true),
            skip_low: rc.skip_low.unwrap_or(false),
            temperature: rc.temperature.unwrap_or(298.15),
            reactants: rc.reactants.unwrap_or(true),
            products: rc.products.unwrap_or(true),
            transition_states: rc.transition_states.unwrap_or(true),
            cho: rc.cho.map(|[c, h, o]| ActiveSite::new(c, h, o)),
            scf: rc.scf,
            queue_template: rc.queue_template.map(String::try_from).transpose()?,
        };
        ret.validate()?;
        Ok(ret)
    }
}

impl Default for Config {
    fn default() -> Self {
        // every field of RawConfig is optional and the default reaction parses
        Self::try_from(RawConfig::default())
            .unwrap_or_else(|e| panic!("invalid default config: {e}"))
    }
}

impl Config {
    pub fn load(filename: impl AsRef<Path>) -> Result<Self, DatsError> {
        let filename = filename.as_ref();
        let contents = read_to_string(filename).map_err(|e| {
            DatsError::Io(filename.display().to_string(), e.kind())
        })?;
        let raw: RawConfig = toml::from_str(&contents).map_err(|e| {
            DatsError::Configuration(format!(
                "failed to deserialize config file '{}' with {e}",
                filename.display()
            ))
        })?;
        Self::try_from(raw)
    }

    /// check that the settings in `self` make any sense
    fn validate(&self) -> Result<(), DatsError> {
        if self.cpu == 0 {
            return Err(DatsError::Configuration("cpu must be positive".into()));
        }
        if self.attempts == 0 {
            return Err(DatsError::Configuration(
                "attempts must be positive".into(),
            ));
        }
        if self.reaction == Reaction::Addition && self.partner.is_none() {
            return Err(DatsError::Configuration(
                "CC addition requires a partner structure".into(),
            ));
        }
        if let Some(site) = self.cho
            && site.indices().contains(&0)
        {
            return Err(DatsError::Configuration(format!(
                "CHO indices are 1-based, got {site}"
            )));
        }
        Ok(())
    }

    pub fn resources(&self) -> Resources {
        Resources {
            cpu: self.cpu,
            mem: self.mem,
            partition: self.partition.clone(),
            time: self.time.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load() {
        let got = Config::load("testfiles/dats.toml").unwrap();
        let want = Config {
            reaction: Reaction::Abstraction,
            partner: None,
            program: ProgramKind::Orca,
            queue: QueueKind::Local,
            method: "r2scan-3c".into(),
            basis: String::new(),
            low_method: "b97-3c".into(),
            low_basis: "6-31+g(d,p)".into(),
            charge: 0,
            cpu: 8,
            mem: 16000,
            partition: "q64".into(),
            time: "24:00:00".into(),
            interval: Some(30),
            initial_delay: None,
            attempts: 200,
            max_conformers: 20,
            freq_cutoff: -150.0,
            ewin: 8.0,
            gfn: 2,
            energy_cutoff: 5.0,
            filter: true,
            filter_step: Step::SinglePoint,
            rmsd_threshold: 0.38,
            auto: true,
            skip_low: true,
            temperature: 298.15,
            reactants: true,
            products: false,
            transition_states: true,
            cho: None,
            scf: Some("scf=(xqc)".into()),
            queue_template: None,
        };
        assert_eq!(got, want);
    }

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.reaction, Reaction::Abstraction);
        assert_eq!(c.program, ProgramKind::Gaussian);
        assert_eq!(c.freq_cutoff, -120.0);
        assert_eq!(c.resources(), Resources::default());
    }

    #[test]
    fn unknown_field() {
        let err = toml::from_str::<RawConfig>("reactoin = \"OH\"").unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn bad_reaction() {
        let raw: RawConfig = toml::from_str("reaction = \"SN2\"").unwrap();
        assert!(matches!(
            Config::try_from(raw),
            Err(DatsError::Configuration(_))
        ));
    }

    #[test]
    fn addition_needs_partner() {
        let raw: RawConfig = toml::from_str("reaction = \"CC\"").unwrap();
        assert!(Config::try_from(raw).is_err());
        let raw: RawConfig =
            toml::from_str("reaction = \"CC\"\npartner = \"ch3o2.xyz\"").unwrap();
        assert_eq!(Config::try_from(raw).unwrap().reaction, Reaction::Addition);
    }

    #[test]
    fn literal_template() {
        let raw: RawConfig =
            toml::from_str("queue_template = \"#!/bin/sh\\n\"").unwrap();
        assert_eq!(
            Config::try_from(raw).unwrap().queue_template.as_deref(),
            Some("#!/bin/sh\n")
        );
    }
}
