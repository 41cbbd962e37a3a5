use std::fmt::Write;

use geom::Atom;

use super::{
    Calculation, LogSummary, MAX_ITER, Procedure, Program, ProgramError,
    most_negative, parse_energy, parse_triple,
};

#[cfg(test)]
mod tests;

/// Gaussian 16
#[derive(Clone, Copy, Debug, Default)]
pub struct Gaussian;

impl Gaussian {
    /// Gaussian needs an explicit `u` prefix for open-shell references, and
    /// chokes on one for closed shells
    pub fn method(method: &str, mult: usize) -> String {
        let unrestricted = method.to_lowercase().starts_with('u');
        if mult == 2 && !unrestricted {
            format!("u{method}")
        } else if mult == 1 && unrestricted {
            method[1..].to_owned()
        } else {
            method.to_owned()
        }
    }

    fn route(calc: &Calculation) -> Result<String, ProgramError> {
        Ok(match calc.procedure {
            Procedure::TsOpt => match calc.attempt {
                1 => format!(
                    "opt=(calcfc,ts,noeigen,MaxCycles={MAX_ITER},ReCalcFC=5,Maxstep=10) freq"
                ),
                2 => format!(
                    "opt=(calcfc,ts,noeigen,ReCalcFC=2,MaxCycles={MAX_ITER},MaxStep=10) freq"
                ),
                _ => format!(
                    "opt=(calcfc,ts,noeigen,MaxCycles={MAX_ITER},RecalcFC=10) freq"
                ),
            },
            Procedure::ConstrainedOpt => "opt=modredundant".to_owned(),
            Procedure::Opt if calc.attempt > 0 => {
                format!("opt=(calcfc,MaxCycles={MAX_ITER},MaxStep=10) freq")
            }
            Procedure::Opt => "opt freq".to_owned(),
            Procedure::SinglePt => "sp".to_owned(),
            p @ Procedure::ConformerSearch => {
                return Err(ProgramError::Unsupported("g16", p));
            }
        })
    }
}

impl Program for Gaussian {
    fn name(&self) -> &'static str {
        "g16"
    }

    fn extension(&self) -> &'static str {
        "com"
    }

    fn log_extension(&self) -> &'static str {
        "log"
    }

    fn termination(&self) -> &'static str {
        "Normal termination"
    }

    fn error_banner(&self) -> &'static str {
        "Error termination"
    }

    fn convergence_errors(&self) -> &'static [&'static str] {
        &["l9999", "l508"]
    }

    fn intervention_errors(&self) -> &'static [&'static str] {
        &["l301"]
    }

    /// optimizations followed by a frequency calculation print the banner
    /// once for each job step
    fn required_terminations(&self, proc: Procedure) -> usize {
        if proc.has_freq() { 2 } else { 1 }
    }

    fn render_input(&self, calc: &Calculation) -> Result<String, ProgramError> {
        let method = Self::method(&calc.method, calc.mult);
        let mut route =
            format!("# {} {}", calc.method_basis(&method), Self::route(calc)?);
        if let Some(scf) = &calc.scf {
            write!(route, " {scf}").unwrap();
        }
        let mut body = String::new();
        writeln!(body, "%nprocshared={}", calc.cpu).unwrap();
        writeln!(body, "%mem={}mb", calc.mem).unwrap();
        writeln!(body, "{route}\n").unwrap();
        writeln!(body, "{}\n", calc.name).unwrap();
        writeln!(body, "{} {}", calc.charge, calc.mult).unwrap();
        calc.write_atoms(&mut body);
        body.push('\n');
        if calc.procedure == Procedure::ConstrainedOpt {
            let site = calc.site()?;
            writeln!(body, "B {} {} F", site.c, site.h).unwrap();
            writeln!(body, "B {} {} F\n", site.h, site.o).unwrap();
        }
        Ok(body)
    }

    fn command(&self, calc: &Calculation) -> String {
        format!("$G16_CMD {}.com", calc.name)
    }

    fn parse_log(
        &self,
        contents: &str,
        proc: Procedure,
    ) -> Result<LogSummary, ProgramError> {
        const OUT: &str = "g16 log";
        let lines: Vec<_> = contents.lines().collect();
        let mut ret = LogSummary::default();
        let mut orientation = None;
        // line index of each `Frequencies --` line, one per three modes
        let mut freq_lines = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if line.contains("SCF Done:") {
                ret.electronic_energy = parse_energy(line, 4, OUT)?;
            } else if line.contains("Sum of electronic and zero-point Energies=")
            {
                ret.zero_point_corrected = parse_energy(line, 6, OUT)?;
            } else if line.contains("Standard orientation:")
                || line.contains("Input orientation:")
            {
                orientation = Some(i);
            } else if line.contains("Frequencies --") {
                freq_lines.push(i);
                ret.frequencies.extend(
                    line.split_whitespace()
                        .skip(2)
                        .filter_map(|f| f.parse::<f64>().ok()),
                );
            } else if line.contains("Rotational constants (GHZ):") {
                // linear molecules print asterisks for the zero constant
                if let Some(r) = parse_triple(line.split_whitespace().skip(3)) {
                    ret.rotational_constants = Some(r);
                }
            } else if line.contains("Molecular mass:") {
                ret.mass = line
                    .split_whitespace()
                    .nth(2)
                    .and_then(|s| s.parse().ok());
            } else if line.contains("Rotational symmetry number") {
                ret.symmetry_number = line
                    .split_whitespace()
                    .nth(3)
                    .and_then(|s| s.trim_end_matches('.').parse().ok());
            } else if let Some(rest) = line.split("Multiplicity =").nth(1) {
                ret.multiplicity = rest.trim().parse().ok();
            }
        }

        if let Some(start) = orientation {
            ret.atoms = Some(read_orientation(&lines[start..]));
        }

        if let Some((k, _)) = most_negative(&ret.frequencies)
            && let Some(&start) = freq_lines.get(k / 3)
        {
            let natoms = ret.atoms.as_ref().map_or(0, Vec::len);
            ret.imaginary_mode =
                read_mode(&lines[start..], k % 3, natoms);
        }

        if proc != Procedure::ConformerSearch
            && ret.electronic_energy.is_none()
        {
            return Err(ProgramError::EnergyNotFound(OUT.to_owned()));
        }
        if proc.has_freq() && ret.atoms.is_none() {
            return Err(ProgramError::GeomNotFound(OUT.to_owned()));
        }
        Ok(ret)
    }
}

/// read the atoms of an orientation block starting at its title line:
///
/// ```text
///                          Standard orientation:
/// ---------------------------------------------------------------------
/// Center     Atomic      Atomic             Coordinates (Angstroms)
/// Number     Number       Type             X           Y           Z
/// ---------------------------------------------------------------------
///      1          6           0        0.000000    0.000000    0.000000
/// ---------------------------------------------------------------------
/// ```
fn read_orientation(lines: &[&str]) -> Vec<Atom> {
    let mut atoms = Vec::new();
    for line in lines.iter().skip(5) {
        if line.trim_start().starts_with("---") {
            break;
        }
        let fields: Vec<_> = line.split_whitespace().collect();
        if fields.len() != 6 {
            break;
        }
        let (Ok(n), Some(pos)) = (
            fields[1].parse::<usize>(),
            parse_triple(fields[3..].iter().copied()),
        ) else {
            break;
        };
        atoms.push(Atom::new(n, pos[0], pos[1], pos[2]));
    }
    atoms
}

/// read column `col` of the displacement table following the `Frequencies --`
/// line at the start of `lines`. rows look like
///
/// ```text
///   Atom  AN      X      Y      Z        X      Y      Z        X      Y      Z
///      1   6     0.02  -0.02   0.06     0.00   0.00   0.11     0.03   0.01   0.00
/// ```
fn read_mode(lines: &[&str], col: usize, natoms: usize) -> Option<Vec<[f64; 3]>> {
    let start = lines.iter().position(|l| l.contains("Atom  AN"))?;
    let mut ret = Vec::new();
    for line in &lines[start + 1..] {
        let fields: Vec<_> = line.split_whitespace().collect();
        // the next block starts with mode numbers or the table ends
        if fields.len() < 5 || fields[1].parse::<usize>().is_err() {
            break;
        }
        ret.push(parse_triple(fields[2 + 3 * col..].iter().copied())?);
        if ret.len() == natoms {
            break;
        }
    }
    (!ret.is_empty()).then_some(ret)
}
