use std::{error::Error, fmt::Display};

use geom::SiteError;
use kinetics::RateConstantError;
use qcjobs::{ProgramError, SubmitError};

use crate::validate::Rejection;

#[derive(Debug)]
pub enum DatsError {
    /// unusable settings or input files. fatal
    Configuration(String),
    /// the queue refused a job or returned no id. fatal for the ensemble
    Submission(SubmitError),
    /// the log file of a finished job never appeared
    LogUnavailable(String),
    /// the job of the named molecule left the queue without finishing its
    /// log
    Abandoned(String),
    /// a recoverable numerical failure in the named molecule
    Convergence(String),
    /// a failure that needs someone to look at the named molecule
    Intervention(String),
    /// a converged structure is not the intended transition state
    Validation(String, Rejection),
    RateConstant(RateConstantError),
    /// a new geometry does not fit the active site of the named molecule
    Geometry(String, SiteError),
    /// rendering an input or reading a log failed
    Program(ProgramError),
    Io(String, std::io::ErrorKind),
    /// a collection file could not be written or read back
    Persist(String),
}

impl Display for DatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatsError::Configuration(e) => write!(f, "configuration error: {e}"),
            DatsError::Submission(e) => write!(f, "submission error: {e}"),
            DatsError::LogUnavailable(path) => {
                write!(f, "log file {path} never appeared")
            }
            DatsError::Abandoned(name) => {
                write!(f, "{name} left the queue without finishing")
            }
            DatsError::Convergence(name) => {
                write!(f, "{name} failed to converge")
            }
            DatsError::Intervention(name) => {
                write!(f, "{name} needs manual inspection")
            }
            DatsError::Validation(name, why) => {
                write!(f, "{name} is not a transition state: {why}")
            }
            DatsError::RateConstant(e) => {
                write!(f, "cannot compute rate constant: {e}")
            }
            DatsError::Geometry(name, e) => {
                write!(f, "bad geometry for {name}: {e}")
            }
            DatsError::Program(e) => write!(f, "{e}"),
            DatsError::Io(path, kind) => write!(f, "{path}: {kind}"),
            DatsError::Persist(e) => write!(f, "failed to persist: {e}"),
        }
    }
}

impl Error for DatsError {}

impl From<SubmitError> for DatsError {
    fn from(value: SubmitError) -> Self {
        Self::Submission(value)
    }
}

impl From<ProgramError> for DatsError {
    fn from(value: ProgramError) -> Self {
        Self::Program(value)
    }
}

impl From<RateConstantError> for DatsError {
    fn from(value: RateConstantError) -> Self {
        Self::RateConstant(value)
    }
}
