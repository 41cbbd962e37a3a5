use std::{
    error::Error,
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use geom::{ActiveSite, Atom};
use serde::{Deserialize, Serialize};

pub mod crest;
pub mod gaussian;
pub mod orca;

pub use crest::Crest;
pub use gaussian::Gaussian;
pub use orca::Orca;

/// the number of lines from the end of a log file searched for error
/// signatures
pub const TAIL_LINES: usize = 30;

/// the maximum number of optimization cycles requested from any program
pub(crate) const MAX_ITER: usize = 150;

/// methods that carry their own basis set
pub const METHODS_NO_BASIS: [&str; 6] =
    ["b97-3c", "r2scan-3c", "pm3", "am1", "pm6", "pm7"];

#[derive(Debug, PartialEq, Eq)]
pub enum ProgramError {
    FileNotFound(String),
    ReadFileError(String, std::io::ErrorKind),
    WriteFileError(String, std::io::ErrorKind),
    ErrorInOutput(String),
    EnergyNotFound(String),
    EnergyParseError(String),
    GeomNotFound(String),
    MissingActiveSite(String),
    Unsupported(&'static str, Procedure),
}

impl ProgramError {
    /// Returns `true` if the program error is [`ErrorInOutput`].
    ///
    /// [`ErrorInOutput`]: ProgramError::ErrorInOutput
    #[must_use]
    pub fn is_error_in_output(&self) -> bool {
        matches!(self, Self::ErrorInOutput(..))
    }
}

impl Display for ProgramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for ProgramError {}

/// The kind of calculation requested from a program
#[derive(
    Debug, Default, PartialEq, Eq, Hash, Copy, Clone, Serialize, Deserialize,
)]
pub enum Procedure {
    /// conformer sampling, optionally with the active site held fixed
    ConformerSearch,
    /// optimization with the active-site bonds frozen
    ConstrainedOpt,
    /// minimum optimization followed by frequencies
    #[default]
    Opt,
    /// saddle-point optimization followed by frequencies
    TsOpt,
    /// fixed-geometry energy refinement
    SinglePt,
}

impl Procedure {
    /// whether the procedure ends with a vibrational analysis
    pub fn has_freq(&self) -> bool {
        matches!(self, Procedure::Opt | Procedure::TsOpt)
    }
}

/// which family of error signatures an error-terminated log matched
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// known numerical trouble, retried with more damping
    Convergence,
    /// needs someone to look at the structure
    Intervention,
    /// error banner without a known signature
    Other,
}

/// The state of a log file judged only by its content
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// the termination banner appeared as often as the procedure requires
    Normal,
    Error(ErrorClass),
    /// neither banner, or fewer termination banners than required
    Unfinished { banners: usize },
}

/// Everything a program needs to render an input file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    /// base name shared by the input, log, and auxiliary files
    pub name: String,
    pub procedure: Procedure,
    pub atoms: Vec<Atom>,
    pub charge: isize,
    pub mult: usize,
    pub active_site: Option<ActiveSite>,
    pub method: String,
    pub basis: String,
    /// extra SCF keyword appended to the route line
    pub scf: Option<String>,
    pub cpu: usize,
    /// total memory in MB
    pub mem: usize,
    /// the number of failed previous attempts, used to escalate damping
    pub attempt: usize,
    /// GFN-xTB version for conformer sampling
    pub gfn: usize,
    /// energy window for conformer sampling in kcal/mol
    pub ewin: f64,
}

impl Calculation {
    /// `method basis`, or just the method if it carries its own basis
    pub fn method_basis(&self, method: &str) -> String {
        if METHODS_NO_BASIS.contains(&method.to_lowercase().as_str())
            || self.basis.is_empty()
        {
            method.to_owned()
        } else {
            format!("{method} {}", self.basis)
        }
    }

    pub(crate) fn site(&self) -> Result<ActiveSite, ProgramError> {
        self.active_site
            .ok_or_else(|| ProgramError::MissingActiveSite(self.name.clone()))
    }

    pub(crate) fn write_atoms(&self, out: &mut String) {
        use std::fmt::Write;
        for atom in &self.atoms {
            writeln!(out, "{atom}").unwrap();
        }
    }
}

/// The values parsed out of a finished log file. Everything is optional
/// because which quantities appear depends on the procedure
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    /// the last geometry printed
    pub atoms: Option<Vec<Atom>>,
    pub electronic_energy: Option<f64>,
    pub zero_point_corrected: Option<f64>,
    /// vibrational frequencies in cm⁻¹ in the order they are printed
    pub frequencies: Vec<f64>,
    /// Cartesian displacements of the most negative mode
    pub imaginary_mode: Option<Vec<[f64; 3]>>,
    /// rotational constants in GHz
    pub rotational_constants: Option<[f64; 3]>,
    /// molecular mass in amu
    pub mass: Option<f64>,
    pub symmetry_number: Option<usize>,
    pub multiplicity: Option<usize>,
}

/// the index and value of the most negative entry of `freqs`, if any are
/// negative
pub fn most_negative(freqs: &[f64]) -> Option<(usize, f64)> {
    freqs
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, f)| *f < 0.0)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// the last `n` lines of `contents`
pub fn tail(contents: &str, n: usize) -> Vec<&str> {
    let lines: Vec<_> = contents.lines().collect();
    lines[lines.len().saturating_sub(n)..].to_vec()
}

/// A trait for describing the quantum chemistry programs a workflow can run
pub trait Program: Sync {
    fn name(&self) -> &'static str;

    /// the file extension for the input file
    fn extension(&self) -> &'static str;

    /// the file extension of the log file the program writes
    fn log_extension(&self) -> &'static str;

    /// the banner printed when the program finishes normally
    fn termination(&self) -> &'static str;

    /// the banner printed when the program gives up
    fn error_banner(&self) -> &'static str;

    /// substrings of error-terminated logs that can be fixed by more damping
    fn convergence_errors(&self) -> &'static [&'static str];

    /// substrings of error-terminated logs that need manual attention
    fn intervention_errors(&self) -> &'static [&'static str];

    /// how many times the termination banner must appear before a log of
    /// `proc` is finished
    fn required_terminations(&self, _proc: Procedure) -> usize {
        1
    }

    /// render the input file for `calc`
    fn render_input(&self, calc: &Calculation) -> Result<String, ProgramError>;

    /// the line of a submit script that runs the input for `calc`
    fn command(&self, calc: &Calculation) -> String;

    /// parse the contents of a log file for `proc`
    fn parse_log(
        &self,
        contents: &str,
        proc: Procedure,
    ) -> Result<LogSummary, ProgramError>;

    fn infile(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.{}", self.extension()))
    }

    fn logfile(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.{}", self.log_extension()))
    }

    /// write the input file for `calc` into `dir` and return its path
    fn write_input(
        &self,
        calc: &Calculation,
        dir: &Path,
    ) -> Result<PathBuf, ProgramError> {
        let body = self.render_input(calc)?;
        let path = self.infile(dir, &calc.name);
        std::fs::write(&path, body).map_err(|e| {
            ProgramError::WriteFileError(path.display().to_string(), e.kind())
        })?;
        Ok(path)
    }

    /// read and parse the log file at `path`
    fn read_output(
        &self,
        path: &Path,
        proc: Procedure,
    ) -> Result<LogSummary, ProgramError> {
        let name = path.display().to_string();
        if !path.exists() {
            return Err(ProgramError::FileNotFound(name));
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProgramError::ReadFileError(name, e.kind()))?;
        self.parse_log(&contents, proc)
    }

    /// classify the contents of a log file. the termination banner is counted
    /// over the whole file, error signatures only over the last
    /// [TAIL_LINES] lines
    fn classify(&self, contents: &str, proc: Procedure) -> Termination {
        let banners = contents.matches(self.termination()).count();
        if banners >= self.required_terminations(proc) {
            return Termination::Normal;
        }
        let tail = tail(contents, TAIL_LINES);
        let found = |sigs: &[&str]| {
            sigs.iter().any(|s| tail.iter().any(|line| line.contains(s)))
        };
        if !found(&[self.error_banner()]) {
            return Termination::Unfinished { banners };
        }
        Termination::Error(if found(self.intervention_errors()) {
            ErrorClass::Intervention
        } else if found(self.convergence_errors()) {
            ErrorClass::Convergence
        } else {
            ErrorClass::Other
        })
    }
}

/// The closed set of programs the workflow knows how to drive
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ProgramKind {
    #[serde(rename = "g16", alias = "G16", alias = "gaussian")]
    Gaussian,
    #[default]
    #[serde(rename = "orca", alias = "ORCA")]
    Orca,
    #[serde(rename = "crest", alias = "CREST")]
    Crest,
}

impl ProgramKind {
    pub fn program(&self) -> &'static dyn Program {
        match self {
            ProgramKind::Gaussian => &Gaussian,
            ProgramKind::Orca => &Orca,
            ProgramKind::Crest => &Crest,
        }
    }
}

impl Display for ProgramKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program().name())
    }
}

impl FromStr for ProgramKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "g16" | "gaussian" => Ok(Self::Gaussian),
            "orca" => Ok(Self::Orca),
            "crest" => Ok(Self::Crest),
            _ => Err(format!("unknown program `{s}`")),
        }
    }
}

/// parses the `nth` field of `line` into a float and returns
/// [ProgramError::EnergyParseError] containing `outname` if it fails. a string
/// containing `outname` is allocated in the Err case
#[inline]
fn parse_energy(
    line: &str,
    nth: usize,
    outname: &str,
) -> Result<Option<f64>, ProgramError> {
    line.split_whitespace()
        .nth(nth)
        .map(str::parse::<f64>)
        .transpose()
        .map_err(|_| ProgramError::EnergyParseError(outname.to_owned()))
}

/// parse the first three whitespace-separated floats of `fields`, returning
/// None if any is missing or malformed
fn parse_triple<'a>(
    mut fields: impl Iterator<Item = &'a str>,
) -> Option<[f64; 3]> {
    let mut ret = [0.0; 3];
    for r in &mut ret {
        *r = fields.next()?.parse().ok()?;
    }
    Some(ret)
}
