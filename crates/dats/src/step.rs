//! The closed set of workflow steps and the table that moves a molecule from
//! one to the next

use std::{fmt::Display, str::FromStr};

use qcjobs::Procedure;
use serde::{Deserialize, Serialize};

use crate::molecule::Role;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum Step {
    #[default]
    #[serde(alias = "init")]
    Init,
    #[serde(alias = "crest_sampling")]
    ConformerSampling,
    #[serde(alias = "opt_constrain")]
    ConstrainedOpt,
    #[serde(alias = "optimization")]
    Optimization,
    #[serde(alias = "TS_opt")]
    TsOpt,
    #[serde(alias = "DLPNO")]
    SinglePoint,
    Done,
}

/// the step after `current` for a molecule with `role`. `skip_low` sends
/// transition-state candidates from sampling straight to the saddle-point
/// search
pub fn next_step(current: Step, role: Role, skip_low: bool) -> Step {
    use Step::*;
    let ts = role == Role::TransitionState;
    match current {
        Init => ConformerSampling,
        ConformerSampling if ts && skip_low => TsOpt,
        ConformerSampling if ts => ConstrainedOpt,
        ConformerSampling => Optimization,
        ConstrainedOpt if ts => TsOpt,
        ConstrainedOpt => Optimization,
        Optimization | TsOpt => SinglePoint,
        SinglePoint | Done => Done,
    }
}

impl Step {
    /// the calculation run for this step, None for the bookkeeping steps
    pub fn procedure(&self) -> Option<Procedure> {
        match self {
            Step::Init | Step::Done => None,
            Step::ConformerSampling => Some(Procedure::ConformerSearch),
            Step::ConstrainedOpt => Some(Procedure::ConstrainedOpt),
            Step::Optimization => Some(Procedure::Opt),
            Step::TsOpt => Some(Procedure::TsOpt),
            Step::SinglePoint => Some(Procedure::SinglePt),
        }
    }

    /// the label used in collection file names
    pub fn label(&self) -> &'static str {
        match self {
            Step::Init => "init",
            Step::ConformerSampling => "crest_sampling",
            Step::ConstrainedOpt => "opt_constrain",
            Step::Optimization => "optimization",
            Step::TsOpt => "TS_opt",
            Step::SinglePoint => "DLPNO",
            Step::Done => "Done",
        }
    }

    /// the suffix appended to a molecule's name while it is in this step
    pub(crate) fn suffix(&self) -> &'static str {
        match self {
            Step::ConformerSampling => "_CREST",
            Step::TsOpt => "_TS",
            Step::SinglePoint => "_DLPNO",
            _ => "",
        }
    }

    pub(crate) const SUFFIXES: [&'static str; 3] = ["_CREST", "_TS", "_DLPNO"];
}

impl Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "init" => Ok(Step::Init),
            "crest_sampling" | "conformersampling" | "crest" => {
                Ok(Step::ConformerSampling)
            }
            "opt_constrain" | "constrainedopt" => Ok(Step::ConstrainedOpt),
            "optimization" | "opt" => Ok(Step::Optimization),
            "ts_opt" | "tsopt" => Ok(Step::TsOpt),
            "dlpno" | "singlepoint" => Ok(Step::SinglePoint),
            "done" => Ok(Step::Done),
            _ => Err(format!("unknown step `{s}`")),
        }
    }
}
