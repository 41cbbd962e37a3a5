use std::{
    fmt::Write,
    path::{Path, PathBuf},
};

use geom::{Structure, read_frames};

use super::{Calculation, LogSummary, Procedure, Program, ProgramError};

/// CREST conformer sampling on top of GFN-xTB
#[derive(Clone, Copy, Debug, Default)]
pub struct Crest;

impl Crest {
    /// the constraint file holding the active-site bonds fixed
    pub fn constraint_file(name: &str) -> String {
        format!("{name}_constrain.inp")
    }

    /// the ensemble CREST leaves behind, copied out of its scratch directory
    pub fn conformer_file(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}_conformers.xyz"))
    }

    /// read at most `max` conformers written by the job for `name`
    pub fn read_conformers(
        dir: &Path,
        name: &str,
        max: usize,
    ) -> Result<Vec<Structure>, ProgramError> {
        let path = Self::conformer_file(dir, name);
        let pname = path.display().to_string();
        if !path.exists() {
            return Err(ProgramError::FileNotFound(pname));
        }
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| ProgramError::ReadFileError(pname.clone(), e.kind()))?;
        let mut frames = read_frames(&contents)
            .map_err(|_| ProgramError::GeomNotFound(pname))?;
        frames.truncate(max);
        Ok(frames)
    }

    fn render_constraints(calc: &Calculation) -> Result<String, ProgramError> {
        let site = calc.site()?;
        let mut body = String::from("$constrain\n");
        body.push_str("  force constant=1.00\n");
        writeln!(body, "  distance: {}, {}, auto", site.c, site.h).unwrap();
        writeln!(body, "  distance: {}, {}, auto", site.h, site.o).unwrap();
        body.push_str("$end\n");
        Ok(body)
    }
}

impl Program for Crest {
    fn name(&self) -> &'static str {
        "crest"
    }

    fn extension(&self) -> &'static str {
        "xyz"
    }

    fn log_extension(&self) -> &'static str {
        "output"
    }

    fn termination(&self) -> &'static str {
        "CREST terminated normally"
    }

    fn error_banner(&self) -> &'static str {
        "terminated abnormally"
    }

    fn convergence_errors(&self) -> &'static [&'static str] {
        &[]
    }

    fn intervention_errors(&self) -> &'static [&'static str] {
        &[]
    }

    fn render_input(&self, calc: &Calculation) -> Result<String, ProgramError> {
        if calc.procedure != Procedure::ConformerSearch {
            return Err(ProgramError::Unsupported("crest", calc.procedure));
        }
        let mut body = String::new();
        writeln!(body, "{}\n{}", calc.atoms.len(), calc.name).unwrap();
        calc.write_atoms(&mut body);
        Ok(body)
    }

    /// write the xyz input and, for transition-state candidates, the
    /// constraint file next to it
    fn write_input(
        &self,
        calc: &Calculation,
        dir: &Path,
    ) -> Result<PathBuf, ProgramError> {
        let write = |path: PathBuf, body: String| {
            std::fs::write(&path, body).map_err(|e| {
                ProgramError::WriteFileError(path.display().to_string(), e.kind())
            })
        };
        if calc.active_site.is_some() {
            write(
                dir.join(Self::constraint_file(&calc.name)),
                Self::render_constraints(calc)?,
            )?;
        }
        let path = self.infile(dir, &calc.name);
        write(path.clone(), self.render_input(calc)?)?;
        Ok(path)
    }

    /// CREST litters its working directory, so each job runs in its own
    /// scratch directory and only the final ensemble is copied back
    fn command(&self, calc: &Calculation) -> String {
        let name = &calc.name;
        let cinp = if calc.active_site.is_some() {
            format!(" --cinp ../{}", Self::constraint_file(name))
        } else {
            String::new()
        };
        format!(
            "(mkdir -p {name}_crest && cd {name}_crest && \
	     $CREST_CMD ../{name}.xyz --gfn{} --ewin {} --noreftopo{cinp} -T {} \
	     > ../{name}.output 2>&1 && cp crest_conformers.xyz ../{name}_conformers.xyz)",
            calc.gfn, calc.ewin, calc.cpu,
        )
    }

    /// CREST logs carry nothing the workflow needs beyond the banner, the
    /// conformers are read with [Crest::read_conformers]
    fn parse_log(
        &self,
        _contents: &str,
        _proc: Procedure,
    ) -> Result<LogSummary, ProgramError> {
        Ok(LogSummary::default())
    }
}

#[cfg(test)]
mod tests {
    use geom::{ActiveSite, Atom};
    use insta::assert_snapshot;

    use super::*;

    fn calc() -> Calculation {
        Calculation {
            name: "ethane_H1".into(),
            procedure: Procedure::ConformerSearch,
            atoms: vec![
                Atom::new(6, 0.0, 0.0, 0.0),
                Atom::new(1, 1.25, 0.0, 0.0),
                Atom::new(8, 2.5, 0.0, 0.0),
            ],
            charge: 0,
            mult: 2,
            active_site: Some(ActiveSite::new(1, 2, 3)),
            cpu: 4,
            gfn: 2,
            ewin: 8.0,
            ..Default::default()
        }
    }

    #[test]
    fn inputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = Crest.write_input(&calc(), dir.path()).unwrap();
        assert_eq!(path, dir.path().join("ethane_H1.xyz"));
        let xyz = std::fs::read_to_string(path).unwrap();
        assert_snapshot!(xyz, @r"
        3
        ethane_H1
        C 0.000000 0.000000 0.000000
        H 1.250000 0.000000 0.000000
        O 2.500000 0.000000 0.000000
        ");
        let cons =
            std::fs::read_to_string(dir.path().join("ethane_H1_constrain.inp"))
                .unwrap();
        assert_snapshot!(cons, @r"
        $constrain
          force constant=1.00
          distance: 1, 2, auto
          distance: 2, 3, auto
        $end
        ");
    }

    #[test]
    fn unconstrained() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = calc();
        c.active_site = None;
        Crest.write_input(&c, dir.path()).unwrap();
        assert!(!dir.path().join("ethane_H1_constrain.inp").exists());
        assert!(!Crest.command(&c).contains("--cinp"));
    }

    #[test]
    fn command() {
        assert_eq!(
            Crest.command(&calc()),
            "(mkdir -p ethane_H1_crest && cd ethane_H1_crest && \
	     $CREST_CMD ../ethane_H1.xyz --gfn2 --ewin 8 --noreftopo \
	     --cinp ../ethane_H1_constrain.inp -T 4 > ../ethane_H1.output 2>&1 \
	     && cp crest_conformers.xyz ../ethane_H1_conformers.xyz)"
        );
    }

    #[test]
    fn conformers() {
        let dir = tempfile::tempdir().unwrap();
        let frame = "2\n -1.0\nH 0.0 0.0 0.0\nH 0.0 0.0 0.74\n";
        std::fs::write(
            Crest::conformer_file(dir.path(), "h2"),
            frame.repeat(3),
        )
        .unwrap();
        let got = Crest::read_conformers(dir.path(), "h2", 2).unwrap();
        assert_eq!(got.len(), 2);
        assert!(Crest::read_conformers(dir.path(), "missing", 2).is_err());
    }
}
