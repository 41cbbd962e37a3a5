//! Tunneling through an asymmetric Eckart barrier fitted to the forward and
//! reverse barrier heights and the imaginary frequency of the transition
//! state. Everything inside is in atomic units.

use std::f64::consts::PI;

use crate::consts::{AMU_AU, AU_TIME, C_M, KB_AU};

/// relative agreement between successive estimates of κ
const TOLERANCE: f64 = 1e-3;

/// intervals in the first estimate of the energy integral
const START_INTERVALS: usize = 100;

/// give up refining after this many halvings of the step
const MAX_HALVINGS: usize = 16;

/// reaction coordinate grid used to find the range of the potential, in bohr
const X_MIN: f64 = -3.0;
const X_STEP: f64 = 0.01;
const X_POINTS: usize = 600;

/// planck constant in atomic units
const H_AU: f64 = 2.0 * PI;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Eckart {
    /// TS minus reactants in Hartree
    pub forward: f64,
    /// TS minus products in Hartree
    pub reverse: f64,
    /// magnitude of the imaginary frequency in cm⁻¹
    pub imaginary: f64,
    /// `A`, `B`, and `L` of the Eckart potential
    a: f64,
    b: f64,
    l: f64,
    /// energy quantum `h²/(8 m L²)` for the transmission probability
    c: f64,
}

impl Eckart {
    /// fit the barrier. returns None when either barrier is not positive, in
    /// which case there is nothing to tunnel through
    pub fn new(forward: f64, reverse: f64, imaginary: f64) -> Option<Self> {
        let imaginary = imaginary.abs();
        if forward <= 0.0 || reverse <= 0.0 || imaginary == 0.0 {
            return None;
        }
        let wau = imaginary * 100.0 * C_M * AU_TIME;
        let force = -4.0 * PI * PI * wau * wau * AMU_AU;
        let a = forward - reverse;
        let b = (reverse.sqrt() + forward.sqrt()).powi(2);
        let l = -PI * (a - b) * (b + a) / ((-2.0 * force * b).sqrt() * b);
        let c = H_AU * H_AU / (8.0 * AMU_AU * l * l);
        Some(Self {
            forward,
            reverse,
            imaginary,
            a,
            b,
            l,
            c,
        })
    }

    /// the potential at reaction coordinate `x` in bohr
    pub fn potential(&self, x: f64) -> f64 {
        let y = -(2.0 * PI * x / self.l).exp();
        -(y * self.a) / (1.0 - y) - (y * self.b) / (1.0 - y).powi(2)
    }

    /// the transmission probability at energy `e`. the hyperbolic cosines
    /// are all scaled by the largest argument so that high energies do not
    /// overflow
    pub fn transmission(&self, e: f64) -> f64 {
        let alpha = 0.5 * (e.max(0.0) / self.c).sqrt();
        let beta = 0.5 * ((e - self.a).max(0.0) / self.c).sqrt();
        let sum = 2.0 * PI * (alpha + beta);
        let diff = 2.0 * PI * (alpha - beta);
        let delta = 2.0 * PI * 0.5 * ((self.b - self.c).abs() / self.c).sqrt();
        let scale = if self.b >= self.c { sum.max(delta) } else { sum };
        let cosh = |x: f64| 0.5 * ((x - scale).exp() + (-x - scale).exp());
        let cd = if self.b >= self.c {
            cosh(delta)
        } else {
            delta.cos() * (-scale).exp()
        };
        1.0 - (cosh(diff) + cd) / (cosh(sum) + cd)
    }

    /// the lower and upper bounds of the energy integral: the higher of the
    /// two ends of the potential and twice its maximum
    fn energy_range(&self) -> (f64, f64) {
        let v: Vec<f64> = (0..X_POINTS)
            .map(|i| self.potential(X_MIN + X_STEP * i as f64))
            .collect();
        let emin = v[0].max(v[X_POINTS - 1]);
        let vmax = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (emin, 2.0 * vmax)
    }

    /// κ at temperature `t` from a trapezoid rule over `n` intervals, with
    /// the classical contribution above the grid added analytically
    pub(crate) fn integrate(&self, t: f64, n: usize) -> f64 {
        let kt = KB_AU * t;
        let (emin, emax) = self.energy_range();
        let step = (emax - emin) / n as f64;
        let integrand = |i: usize| {
            let e = emin + step * i as f64;
            self.transmission(e) * ((self.forward - e) / kt).exp()
        };
        let mut sum = 0.5 * (integrand(0) + integrand(n));
        for i in 1..n {
            sum += integrand(i);
        }
        sum * step / kt + ((self.forward - emax) / kt).exp()
    }

    /// the tunneling correction at temperature `t` in K. the integration
    /// step is halved until two successive estimates agree to 0.1 %
    pub fn kappa(&self, t: f64) -> f64 {
        let mut n = START_INTERVALS;
        let mut old = self.integrate(t, n);
        for _ in 0..MAX_HALVINGS {
            n *= 2;
            let new = self.integrate(t, n);
            if ((new - old) / old).abs() < TOLERANCE {
                log::debug!("κ = {new:.6} with {n} intervals");
                return new;
            }
            old = new;
        }
        log::warn!("κ not converged after {n} intervals, using {old:.6}");
        old
    }
}
