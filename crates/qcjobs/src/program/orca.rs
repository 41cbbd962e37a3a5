use std::{collections::BTreeMap, fmt::Write};

use geom::Atom;

use super::{
    Calculation, LogSummary, MAX_ITER, Procedure, Program, ProgramError,
    most_negative, parse_energy, parse_triple,
};


/// ORCA
#[derive(Clone, Copy, Debug, Default)]
pub struct Orca;

impl Orca {
    /// translate Gaussian-style method names to their ORCA spelling
    pub fn method(method: &str) -> String {
        match method.to_lowercase().as_str() {
            "uwb97xd" | "wb97xd" => "WB97X-D3".to_owned(),
            _ => method.to_owned(),
        }
    }

    fn maxcore(mem: usize, cpu: usize) -> usize {
        (mem as f64 / cpu.max(1) as f64).round() as usize
    }

    fn header(calc: &Calculation, body: &mut String) {
        let method = Self::method(&calc.method);
        let mb = calc.method_basis(&method);
        match calc.procedure {
            Procedure::SinglePt => {
                let (scf, extra) = match calc.attempt {
                    1 => ("VeryTightSCF", 16000),
                    2 => ("VeryTightSCF", 20000),
                    _ => ("TightSCF", 12000),
                };
                writeln!(
                    body,
                    "! aug-cc-pVTZ aug-cc-pVTZ/C DLPNO-CCSD(T) {scf} RI-JK aug-cc-pVTZ/JK NoTrah"
                )
                .unwrap();
                writeln!(body, "%pal nprocs {} end", calc.cpu).unwrap();
                writeln!(
                    body,
                    "%maxcore {}",
                    Self::maxcore(calc.mem + extra, calc.cpu)
                )
                .unwrap();
                return;
            }
            Procedure::TsOpt => {
                writeln!(body, "! {mb} TightSCF SlowConv OptTS freq").unwrap()
            }
            _ => writeln!(body, "! {mb} TightSCF SlowConv OPT freq").unwrap(),
        }
        writeln!(body, "%pal nprocs {} end", calc.cpu).unwrap();
        writeln!(body, "%maxcore {}", Self::maxcore(calc.mem, calc.cpu))
            .unwrap();
    }
}

impl Program for Orca {
    fn name(&self) -> &'static str {
        "orca"
    }

    fn extension(&self) -> &'static str {
        "inp"
    }

    fn log_extension(&self) -> &'static str {
        "out"
    }

    fn termination(&self) -> &'static str {
        "****ORCA TERMINATED NORMALLY****"
    }

    fn error_banner(&self) -> &'static str {
        "ORCA finished by error termination"
    }

    fn convergence_errors(&self) -> &'static [&'static str] {
        &["SCF NOT CONVERGED", "The optimization did not converge"]
    }

    fn intervention_errors(&self) -> &'static [&'static str] {
        &["UNRECOGNIZED OR DUPLICATED KEYWORD", "INPUT ERROR"]
    }

    /// ORCA indexes atoms from 0 in its constraint blocks
    fn render_input(&self, calc: &Calculation) -> Result<String, ProgramError> {
        let mut body = String::new();
        if calc.procedure == Procedure::ConformerSearch {
            return Err(ProgramError::Unsupported("orca", calc.procedure));
        }
        Self::header(calc, &mut body);
        match calc.procedure {
            Procedure::ConstrainedOpt => {
                let (c, h, o) = calc.site()?.zero_based();
                body.push_str("%geom\nConstraints\n");
                writeln!(body, "{{B {c} {h} C}}").unwrap();
                writeln!(body, "{{B {h} {o} C}}").unwrap();
                body.push_str("end\nend\n");
            }
            Procedure::TsOpt => {
                let (c, h, o) = calc.site()?.zero_based();
                body.push_str("%geom\n");
                writeln!(body, "maxiter {MAX_ITER}").unwrap();
                body.push_str("Calc_Hess true\n");
                match calc.attempt {
                    1 => body.push_str("Recalc_Hess 5\nMaxStep 0.1\n"),
                    2 => body.push_str("Recalc_Hess 1\nMaxStep 0.1\n"),
                    _ => body.push_str("Recalc_Hess 10\n"),
                }
                writeln!(body, "TS_Active_Atoms {{ {c} {h} {o} }} end")
                    .unwrap();
                body.push_str("TS_Active_Atoms_Factor 3\nend\n");
            }
            _ => {}
        }
        body.push('\n');
        writeln!(body, "* xyz {} {}", calc.charge, calc.mult).unwrap();
        calc.write_atoms(&mut body);
        body.push_str("*\n");
        Ok(body)
    }

    fn command(&self, calc: &Calculation) -> String {
        format!("$ORCA_CMD {0}.inp > {0}.out", calc.name)
    }

    fn parse_log(
        &self,
        contents: &str,
        proc: Procedure,
    ) -> Result<LogSummary, ProgramError> {
        const OUT: &str = "orca log";
        let lines: Vec<_> = contents.lines().collect();
        let mut ret = LogSummary::default();
        let mut zpe = None;
        let mut coords = None;
        let mut modes_start = None;
        // ORCA numbers every mode, including the zero translations and
        // rotations. keep the label so the mode table can be indexed
        let mut labels = Vec::new();
        let mut in_freqs = false;
        for (i, line) in lines.iter().enumerate() {
            if line.contains("FINAL SINGLE POINT ENERGY") {
                ret.electronic_energy = parse_energy(line, 4, OUT)?;
            } else if line.contains("Zero point energy") {
                zpe = parse_energy(line, 4, OUT)?;
            } else if line.contains("CARTESIAN COORDINATES (ANGSTROEM)") {
                coords = Some(i);
            } else if line.contains("VIBRATIONAL FREQUENCIES") {
                in_freqs = true;
                labels.clear();
                ret.frequencies.clear();
            } else if line.contains("NORMAL MODES") {
                in_freqs = false;
                modes_start = Some(i);
            } else if in_freqs && line.contains("cm**-1") {
                // `   6:     -1234.56 cm**-1 ***imaginary mode***`
                let mut fields = line.split_whitespace();
                let label = fields
                    .next()
                    .and_then(|s| s.trim_end_matches(':').parse::<usize>().ok());
                let freq = fields.next().and_then(|s| s.parse::<f64>().ok());
                if let (Some(label), Some(freq)) = (label, freq)
                    && freq != 0.0
                {
                    labels.push(label);
                    ret.frequencies.push(freq);
                }
            } else if line.contains("Rotational constants in MHz") {
                if let Some(rest) = line.split(':').nth(1)
                    && let Some(r) = parse_triple(rest.split_whitespace())
                {
                    ret.rotational_constants =
                        Some(r.map(|mhz| mhz / 1000.0));
                }
            } else if line.contains("Total Mass") {
                ret.mass =
                    line.split_whitespace().nth(3).and_then(|s| s.parse().ok());
            } else if let Some(rest) = line.split("Symmetry Number:").nth(1) {
                ret.symmetry_number = rest.trim().parse().ok();
            } else if line.contains("Multiplicity") && line.contains("Mult") {
                ret.multiplicity = line
                    .split_whitespace()
                    .last()
                    .and_then(|s| s.parse().ok());
            }
        }

        if let Some(start) = coords {
            ret.atoms = Some(read_coords(&lines[start + 2..]));
        }
        if let (Some(e), Some(z)) = (ret.electronic_energy, zpe) {
            ret.zero_point_corrected = Some(e + z);
        }
        if let Some((k, _)) = most_negative(&ret.frequencies)
            && let Some(start) = modes_start
        {
            let table = read_normal_modes(&lines[start..]);
            ret.imaginary_mode = table.get(&labels[k]).and_then(|col| {
                (col.len() % 3 == 0).then(|| {
                    col.chunks(3).map(|c| [c[0], c[1], c[2]]).collect()
                })
            });
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

/// read atom lines until the first blank line
fn read_coords(lines: &[&str]) -> Vec<Atom> {
    lines
        .iter()
        .take_while(|l| !l.trim().is_empty())
        .map_while(|l| l.parse().ok())
        .collect()
}

/// read the NORMAL MODES table into columns keyed by mode number. the table is
/// printed in blocks of up to six columns:
///
/// ```text
///                   0          1          2          3          4          5
///       0       0.000000   0.000000   0.000000   0.000000   0.000000   0.000000
///       1       0.000000   0.000000   0.000000   0.000000   0.000000   0.000000
/// ```
fn read_normal_modes(lines: &[&str]) -> BTreeMap<usize, Vec<f64>> {
    let mut ret: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    let mut header: Vec<usize> = Vec::new();
    // skip the title and the explanatory paragraph
    for line in lines.iter().skip(1) {
        let fields: Vec<_> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if let Ok(cols) =
            fields.iter().map(|f| f.parse::<usize>()).collect::<Result<Vec<_>, _>>()
        {
            header = cols;
            continue;
        }
        if header.is_empty() {
            continue;
        }
        let Ok(vals) = fields[1..]
            .iter()
            .map(|f| f.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
        else {
            // prose after the table
            if !ret.is_empty() {
                break;
            }
            continue;
        };
        if fields[0].parse::<usize>().is_err() || vals.len() != header.len() {
            break;
        }
        for (col, v) in header.iter().zip(vals) {
            ret.entry(*col).or_default().push(v);
        }
    }
    ret
}
