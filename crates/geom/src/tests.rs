use std::str::FromStr;

use approx::assert_abs_diff_eq;

use crate::*;

fn water() -> Structure {
    structure![
        H 0.0000000000 0.7574590974 0.5217905143
        O 0.0000000000 0.0000000000 -0.0657441568
        H 0.0000000000 -0.7574590974 0.5217905143
    ]
}

#[test]
fn com() {
    let got = water().com();
    assert_abs_diff_eq!(got[0], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(got[1], 0.0, epsilon = 1e-12);
    let m = water().mass();
    let want = (2.0 * WEIGHTS_H * 0.5217905143
        - 15.99491461957 * 0.0657441568)
        / m;
    assert_abs_diff_eq!(got[2], want, epsilon = 1e-12);
}

const WEIGHTS_H: f64 = 1.00782503223;

#[test]
fn principal_moments_sorted() {
    let mut mol = water();
    let com = mol.com();
    mol.translate(-com);
    let moms = mol.principal_moments();
    assert!(moms[0] <= moms[1] && moms[1] <= moms[2]);
    // planar molecule: Ic = Ia + Ib
    assert_abs_diff_eq!(moms[2], moms[0] + moms[1], epsilon = 1e-10);
    assert_eq!(mol.rotor_type(&moms, 1e-4), Rotor::AsymmTop);
}

#[test]
fn rotor_small() {
    let h = structure![H 0.0 0.0 0.0];
    assert_eq!(h.rotor_type(&h.principal_moments(), 1e-4), Rotor::Atom);
    assert!(h.rotational_constants().is_empty());

    let h2 = structure![
        H 0.0 0.0 0.0
        H 0.0 0.0 0.74
    ];
    let rot = h2.rotor_type(&h2.principal_moments(), 1e-4);
    assert!(rot.is_linear());
}

#[test]
fn diatomic_constant() {
    let h2 = structure![
        H 0.0 0.0 0.0
        H 0.0 0.0 0.74
    ];
    let got = h2.rotational_constants();
    let moi = WEIGHTS_H / 2.0 * 0.74 * 0.74;
    assert_eq!(got.len(), 3);
    assert_eq!(got[0], 0.0);
    assert_abs_diff_eq!(got[1], 505.379_009 / moi, epsilon = 1e-6);
    assert_abs_diff_eq!(got[1], got[2], epsilon = 1e-6);
}

#[test]
fn distance_and_angle() {
    let mol = water();
    assert_abs_diff_eq!(mol.distance(0, 1), 0.958614, epsilon = 1e-6);
    assert_abs_diff_eq!(mol.angle(0, 1, 2), 104.401, epsilon = 1e-3);
    assert_eq!(mol.neighbors(1, 1.2), vec![0, 2]);
    assert_eq!(mol.neighbors(0, 1.2), vec![1]);
}

#[test]
fn rmsd_ignores_rigid_motion() {
    let mol = water();
    let mut moved = mol.clone();
    let axis = vector::normalize(Vec3::new(1.0, 2.0, 3.0));
    for atom in moved.atoms.iter_mut() {
        atom.set_pos(vector::rotate(atom.pos(), axis, 1.1));
    }
    moved.translate(Vec3::new(3.0, -1.0, 0.5));
    assert_abs_diff_eq!(mol.rmsd(&moved).unwrap(), 0.0, epsilon = 1e-8);
}

#[test]
fn rmsd_mirror_image_is_not_a_rotation() {
    let chiral = structure![
        C 0.0 0.0 0.0
        H 1.0 0.0 0.0
        O 0.0 1.2 0.0
        N 0.0 0.0 1.4
    ];
    let mut mirror = chiral.clone();
    for atom in mirror.atoms.iter_mut() {
        atom.x = -atom.x;
    }
    assert!(chiral.rmsd(&mirror).unwrap() > 0.05);
}

#[test]
fn rmsd_mismatched() {
    let mol = water();
    let other = structure![
        O 0.0 0.0 0.0
        H 0.0 0.0 1.0
        H 0.0 1.0 0.0
    ];
    assert_eq!(mol.rmsd(&other), None);
    assert_eq!(mol.rmsd(&Structure::default()), None);
}

#[test]
fn xyz_round_trip_header() {
    let s = "3
comment line
H 0.000000 0.757459 0.521791
O 0.000000 0.000000 -0.065744
H 0.000000 -0.757459 0.521791
";
    let mol = Structure::from_str(s).unwrap();
    assert_eq!(mol.len(), 3);
    assert!(mol.atoms[1].is("o"));
    let shown = mol.to_string();
    assert_eq!(shown.lines().next(), Some("3"));
    assert_eq!(shown.lines().nth(3), Some("H 0.000000 -0.757459 0.521791"));
}

#[test]
fn frames() {
    let s = "2
 -1.1
H 0.0 0.0 0.0
H 0.0 0.0 0.74
2
 -1.0
H 0.0 0.0 0.0
H 0.0 0.0 0.80
";
    let got = read_frames(s).unwrap();
    assert_eq!(got.len(), 2);
    assert_abs_diff_eq!(got[1].distance(0, 1), 0.80, epsilon = 1e-12);
}
