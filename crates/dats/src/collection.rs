//! Ordered lists of molecules saved as JSON after every milestone

use std::{
    fmt::Write,
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use crate::{error::DatsError, molecule::Molecule, step::Step};

/// `<dir>/<base>_<step>.json`
pub fn step_file(dir: &Path, base: &str, step: Step) -> PathBuf {
    dir.join(format!("{base}_{}.json", step.label()))
}

/// write `mols` to `path`, replacing any previous contents. the file is
/// written next to its destination and renamed into place, so a crash never
/// leaves half a collection behind
pub fn save(path: &Path, mols: &[Molecule]) -> Result<(), DatsError> {
    let persist = |e: &dyn std::fmt::Display| {
        DatsError::Persist(format!("{}: {e}", path.display()))
    };
    let tmp = path.with_extension("json.tmp");
    let f = File::create(&tmp).map_err(|e| persist(&e))?;
    serde_json::to_writer_pretty(BufWriter::new(f), mols)
        .map_err(|e| persist(&e))?;
    std::fs::rename(&tmp, path).map_err(|e| persist(&e))?;
    log::debug!("saved {} molecules to {}", mols.len(), path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<Vec<Molecule>, DatsError> {
    let f = File::open(path)
        .map_err(|e| DatsError::Io(path.display().to_string(), e.kind()))?;
    serde_json::from_reader(BufReader::new(f))
        .map_err(|e| DatsError::Persist(format!("{}: {e}", path.display())))
}

/// a table of the molecules in a collection for `--info`
pub fn summarize(mols: &[Molecule]) -> String {
    let mut ret = String::new();
    writeln!(
        ret,
        "{:<24} {:<15} {:>16} {:>10} {:>12} {:>6}",
        "name", "step", "energy", "imag", "Q", "errors"
    )
    .unwrap();
    let opt = |x: Option<f64>, prec: usize| match x {
        Some(x) => format!("{x:.prec$}"),
        None => "-".to_owned(),
    };
    for m in mols {
        writeln!(
            ret,
            "{:<24} {:<15} {:>16} {:>10} {:>12} {:>6}",
            m.name,
            m.step.to_string(),
            opt(m.rate_energy(), 8),
            opt(m.imaginary(), 1),
            m.partition_function
                .map_or_else(|| "-".to_owned(), |q| format!("{q:.4e}")),
            m.error_termination_count,
        )
        .unwrap();
    }
    ret
}

#[cfg(test)]
mod tests {
    use geom::structure;
    use insta::assert_snapshot;

    use crate::molecule::Role;

    use super::*;

    fn mols() -> Vec<Molecule> {
        let s = structure![
            C 0.0 0.0 0.0
            H 1.09 0.0 0.0
        ];
        let mut a = Molecule::new("ethane_H1_conf1", "/tmp", s.atoms.clone(), 2, Role::Product);
        a.zero_point_corrected = Some(-79.123456789);
        a.partition_function = Some(1.234e9);
        a.step = Step::Optimization;
        let mut b = Molecule::new("ethane_H1_TS", "/tmp", s.atoms, 2, Role::TransitionState);
        b.frequencies = vec![-1234.56, 100.0];
        b.step = Step::TsOpt;
        b.error_termination_count = 1;
        vec![a, b]
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = step_file(dir.path(), "ethane", Step::TsOpt);
        assert_eq!(path, dir.path().join("ethane_TS_opt.json"));
        let want = mols();
        save(&path, &want).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(load(&path).unwrap(), want);
    }

    #[test]
    fn missing_collection() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(&dir.path().join("nope.json")),
            Err(DatsError::Io(_, std::io::ErrorKind::NotFound))
        ));
    }

    #[test]
    fn corrupt_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[{\"name\": 3}]").unwrap();
        assert!(matches!(load(&path), Err(DatsError::Persist(_))));
    }

    #[test]
    fn summary() {
        assert_snapshot!(summarize(&mols()), @r"
        name                     step                      energy       imag            Q errors
        ethane_H1_conf1          optimization        -79.12345679          -     1.2340e9      0
        ethane_H1_TS             TS_opt                         -    -1234.6            -      1
        ");
    }
}
