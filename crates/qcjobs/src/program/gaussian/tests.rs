use approx::assert_abs_diff_eq;
use geom::{ActiveSite, Atom};
use insta::assert_snapshot;
use test_case::test_case;

use crate::program::{
    Calculation, ErrorClass, Procedure, Program, ProgramError, Termination,
};

use super::Gaussian;

fn calc(procedure: Procedure, attempt: usize) -> Calculation {
    Calculation {
        name: "ethane_H1".into(),
        procedure,
        atoms: vec![
            Atom::new(6, 0.0, 0.0, 0.0),
            Atom::new(1, 1.25, 0.0, 0.0),
            Atom::new(8, 2.5, 0.0, 0.0),
            Atom::new(1, 2.75, 0.94, 0.0),
        ],
        charge: 0,
        mult: 2,
        active_site: Some(ActiveSite::new(1, 2, 3)),
        method: "wb97xd".into(),
        basis: "6-31++g(d,p)".into(),
        cpu: 4,
        mem: 8000,
        attempt,
        ..Default::default()
    }
}

#[test]
fn ts_input() {
    let got = Gaussian.render_input(&calc(Procedure::TsOpt, 0)).unwrap();
    assert_snapshot!(got, @r"
    %nprocshared=4
    %mem=8000mb
    # uwb97xd 6-31++g(d,p) opt=(calcfc,ts,noeigen,MaxCycles=150,RecalcFC=10) freq

    ethane_H1

    0 2
    C 0.000000 0.000000 0.000000
    H 1.250000 0.000000 0.000000
    O 2.500000 0.000000 0.000000
    H 2.750000 0.940000 0.000000
    ");
}

#[test_case(1, "ReCalcFC=5,Maxstep=10"; "mild")]
#[test_case(2, "ReCalcFC=2,MaxCycles=150,MaxStep=10"; "strong")]
fn ts_escalation(attempt: usize, want: &str) {
    let got = Gaussian.render_input(&calc(Procedure::TsOpt, attempt)).unwrap();
    assert!(got.lines().nth(2).unwrap().contains(want));
}

#[test]
fn constrained_input() {
    let mut c = calc(Procedure::ConstrainedOpt, 0);
    c.scf = Some("scf=xqc".into());
    let got = Gaussian.render_input(&c).unwrap();
    assert_snapshot!(got, @r"
    %nprocshared=4
    %mem=8000mb
    # uwb97xd 6-31++g(d,p) opt=modredundant scf=xqc

    ethane_H1

    0 2
    C 0.000000 0.000000 0.000000
    H 1.250000 0.000000 0.000000
    O 2.500000 0.000000 0.000000
    H 2.750000 0.940000 0.000000

    B 1 2 F
    B 2 3 F
    ");

    c.active_site = None;
    assert_eq!(
        Gaussian.render_input(&c),
        Err(ProgramError::MissingActiveSite("ethane_H1".into()))
    );
}

#[test]
fn unrestricted_prefix() {
    assert_eq!(Gaussian::method("wb97xd", 2), "uwb97xd");
    assert_eq!(Gaussian::method("UwB97XD", 1), "wB97XD");
    assert_eq!(Gaussian::method("uwb97xd", 2), "uwb97xd");
    assert_eq!(Gaussian::method("wb97xd", 3), "wb97xd");
}

#[test]
fn sampling_unsupported() {
    assert!(Gaussian
        .render_input(&calc(Procedure::ConformerSearch, 0))
        .is_err());
}

#[test]
fn read_ts() {
    let got = Gaussian
        .read_output("testfiles/ts.log".as_ref(), Procedure::TsOpt)
        .unwrap();
    assert_eq!(got.electronic_energy, Some(-115.512345679));
    assert_eq!(got.zero_point_corrected, Some(-115.481111));
    assert_eq!(
        got.frequencies,
        vec![-1523.4567, 210.1234, 450.5678, 900.0, 1200.0, 3700.0]
    );
    let atoms = got.atoms.unwrap();
    assert_eq!(atoms.len(), 4);
    assert_eq!(atoms[1], Atom::new(1, 1.251, 0.001, 0.0));
    let mode = got.imaginary_mode.unwrap();
    assert_eq!(mode.len(), 4);
    assert_eq!(mode[1], [-0.90, 0.05, 0.00]);
    let rot = got.rotational_constants.unwrap();
    assert_abs_diff_eq!(rot[0], 59.0012345);
    assert_eq!(got.mass, Some(30.01057));
    assert_eq!(got.symmetry_number, Some(1));
    assert_eq!(got.multiplicity, Some(2));
}

#[test]
fn mode_in_second_column() {
    let log = std::fs::read_to_string("testfiles/ts.log")
        .unwrap()
        .replace("-1523.4567               210.1234", "1523.4567               -210.1234");
    let got = Gaussian.parse_log(&log, Procedure::TsOpt).unwrap();
    let mode = got.imaginary_mode.unwrap();
    assert_eq!(mode[3], [0.20, 0.40, 0.00]);
}

#[test]
fn missing_energy() {
    assert_eq!(
        Gaussian.parse_log("nothing here", Procedure::Opt),
        Err(ProgramError::EnergyNotFound("g16 log".into()))
    );
    assert!(
        Gaussian
            .read_output("testfiles/nonexistent.log".as_ref(), Procedure::Opt)
            .unwrap_err()
            .to_string()
            .contains("FileNotFound")
    );
}

#[test_case("testfiles/ts.log", Procedure::TsOpt, Termination::Normal)]
#[test_case(
    "testfiles/ts_partial.log",
    Procedure::TsOpt,
    Termination::Unfinished { banners: 1 }
)]
#[test_case("testfiles/ts_partial.log", Procedure::SinglePt, Termination::Normal)]
#[test_case(
    "testfiles/conv_error.log",
    Procedure::TsOpt,
    Termination::Error(ErrorClass::Convergence)
)]
#[test_case(
    "testfiles/intervention.log",
    Procedure::Opt,
    Termination::Error(ErrorClass::Intervention)
)]
fn classify(path: &str, proc: Procedure, want: Termination) {
    let contents = std::fs::read_to_string(path).unwrap();
    let got = Gaussian.classify(&contents, proc);
    assert_eq!(got, want);
    // classifying again gives the same answer
    assert_eq!(Gaussian.classify(&contents, proc), got);
}
