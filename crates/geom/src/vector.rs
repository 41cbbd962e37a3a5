//! Small vector helpers shared by the reaction-site construction code

use crate::Vec3;

/// unit vector along `v`, or the zero vector when `v` is (numerically) zero
pub fn normalize(v: Vec3) -> Vec3 {
    let norm = v.norm();
    if norm < 1e-8 {
        return Vec3::zeros();
    }
    v / norm
}

/// rotate `v` by `angle` radians about the unit vector `axis` using Rodrigues'
/// formula
pub fn rotate(v: Vec3, axis: Vec3, angle: f64) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    v * cos + axis.cross(&v) * sin + axis * axis.dot(&v) * (1.0 - cos)
}

/// a unit vector perpendicular to `v`, preferring the cross product with
/// `reference`. falls back to the Cartesian axes when `v` is parallel to
/// `reference`
pub fn perpendicular(v: Vec3, reference: Vec3) -> Vec3 {
    for r in [reference, Vec3::x(), Vec3::z(), Vec3::y()] {
        let p = normalize(v.cross(&r));
        if p.norm() > 0.5 {
            return p;
        }
    }
    Vec3::zeros()
}

/// angle in degrees at `b` formed by `a`-`b`-`c`
pub fn angle(a: Vec3, b: Vec3, c: Vec3) -> f64 {
    let ba = a - b;
    let bc = c - b;
    let cos = ba.dot(&bc) / (ba.norm() * bc.norm());
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}
