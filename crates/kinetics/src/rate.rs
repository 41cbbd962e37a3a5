use serde::{Deserialize, Serialize};

use crate::{
    Eckart, RateConstantError,
    consts::{H, HARTREE_J, HARTREE_KCAL, KB, NA, R_LATM},
};

/// One converged conformer as seen by the rate expression
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    /// energy in Hartree, zero-point corrected
    pub energy: f64,
    /// partition function
    pub q: f64,
    /// the most negative frequency in cm⁻¹, for transition states
    pub imaginary: Option<f64>,
}

impl Species {
    pub fn new(name: impl Into<String>, energy: f64, q: f64) -> Self {
        Self {
            name: name.into(),
            energy,
            q,
            imaginary: None,
        }
    }
}

/// The converged ensembles of one reaction channel
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RateInput {
    /// conformers of the organic reactant
    pub reactants: Vec<Species>,
    pub oh: Option<Species>,
    pub transition_states: Vec<Species>,
    /// conformers of the organic product. empty means no tunneling
    /// correction
    pub products: Vec<Species>,
    pub h2o: Option<Species>,
    /// temperature in K
    pub temperature: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RateResult {
    /// rate constant in cm³ molecule⁻¹ s⁻¹
    pub k: f64,
    pub kappa: f64,
    /// TS minus reactants in kcal/mol
    pub barrier: f64,
    pub lowest_reactant: String,
    pub lowest_ts: String,
}

fn lowest(ens: &[Species]) -> Option<&Species> {
    ens.iter().min_by(|a, b| a.energy.total_cmp(&b.energy))
}

/// Boltzmann-weighted sum of the partition functions of `ens` relative to its
/// lowest member at `e_low`. each member is weighted by
/// `exp(-(e_low - e_i) / kT)`
fn weighted_q(ens: &[Species], e_low: f64, t: f64) -> f64 {
    ens.iter()
        .map(|s| (-(e_low - s.energy) * HARTREE_J / (KB * t)).exp() * s.q)
        .sum()
}

/// reference number density of an ideal gas at 1 atm in molecules cm⁻³
pub fn reference_density(t: f64) -> f64 {
    NA / (1000.0 * R_LATM * t)
}

/// the bimolecular rate constant of reactant + OH through the transition
/// states of `input`
pub fn rate_constant(input: &RateInput) -> Result<RateResult, RateConstantError> {
    let t = input.temperature;
    let oh = input.oh.as_ref().ok_or(RateConstantError::NoOhReference)?;
    let reactant = lowest(&input.reactants)
        .ok_or(RateConstantError::EmptyEnsemble("reactants"))?;
    let ts = lowest(&input.transition_states)
        .ok_or(RateConstantError::EmptyEnsemble("transition states"))?;

    let e_r = reactant.energy + oh.energy;
    let e_ts = ts.energy;
    let q_r = weighted_q(&input.reactants, reactant.energy, t) * oh.q;
    let q_ts = weighted_q(&input.transition_states, ts.energy, t);

    let kappa = match lowest(&input.products) {
        Some(product) => {
            let h2o =
                input.h2o.as_ref().ok_or(RateConstantError::NoH2oReference)?;
            let imag =
                ts.imaginary.ok_or(RateConstantError::NoImaginaryFrequency)?;
            let e_p = product.energy + h2o.energy;
            match Eckart::new(e_ts - e_r, e_ts - e_p, imag) {
                Some(eck) => eck.kappa(t),
                None => {
                    log::warn!(
                        "no barrier between {} and its neighbors, κ = 1",
                        ts.name
                    );
                    1.0
                }
            }
        }
        None => 1.0,
    };

    let barrier_j = (e_ts - e_r) * HARTREE_J;
    let k = kappa * (KB * t) / (H * reference_density(t)) * (q_ts / q_r)
        * (-barrier_j / (KB * t)).exp();
    log::info!(
        "Ea = {:.4} kcal/mol, κ = {kappa:.4}, k = {k:.4e} cm³ molecule⁻¹ s⁻¹",
        (e_ts - e_r) * HARTREE_KCAL
    );
    Ok(RateResult {
        k,
        kappa,
        barrier: (e_ts - e_r) * HARTREE_KCAL,
        lowest_reactant: reactant.name.clone(),
        lowest_ts: ts.name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const T: f64 = 298.15;

    fn golden() -> RateInput {
        RateInput {
            reactants: vec![Species::new("ethane", -100.123456, 1.0)],
            oh: Some(Species::new("OH", 0.0, 1.0)),
            transition_states: vec![Species {
                imaginary: Some(-450.0),
                ..Species::new("ethane_H1_TS", -100.098765, 1.0)
            }],
            products: vec![Species::new("ethane_H1", -100.145000, 1.0)],
            h2o: Some(Species::new("H2O", 0.0, 1.0)),
            temperature: T,
        }
    }

    #[test]
    fn golden_rate() {
        let got = rate_constant(&golden()).unwrap();
        assert_relative_eq!(got.kappa, 1.230935167353539, max_relative = 1e-6);
        assert_relative_eq!(got.k, 1.3660718920476933e-18, max_relative = 1e-6);
        assert_relative_eq!(got.barrier, 15.49382, max_relative = 1e-6);
        assert_eq!(got.lowest_ts, "ethane_H1_TS");
    }

    #[test]
    fn without_products() {
        let mut input = golden();
        input.products.clear();
        let got = rate_constant(&input).unwrap();
        assert_eq!(got.kappa, 1.0);
        assert_relative_eq!(got.k, 1.1097837873823144e-18, max_relative = 1e-6);
    }

    #[test]
    fn boltzmann_weights() {
        let mut input = golden();
        input.products.clear();
        let one = rate_constant(&input).unwrap().k;
        // a degenerate second TS conformer doubles Q_TS
        input.transition_states.push(Species::new("b", -100.098765, 1.0));
        assert_relative_eq!(
            rate_constant(&input).unwrap().k,
            2.0 * one,
            max_relative = 1e-12
        );
        // a degenerate reactant conformer halves it again
        input.reactants.push(Species::new("d", -100.123456, 1.0));
        assert_relative_eq!(
            rate_constant(&input).unwrap().k,
            one,
            max_relative = 1e-12
        );
    }

    #[test]
    fn weights_of_higher_conformers() {
        let mut input = golden();
        input.products.clear();
        let one = rate_constant(&input).unwrap();
        // 1 mEh above the lowest TS: weight exp(+1.0591146) at 298.15 K
        input.transition_states.push(Species::new("b", -100.097765, 1.0));
        let got = rate_constant(&input).unwrap();
        assert_eq!(got.lowest_ts, one.lowest_ts);
        assert_relative_eq!(got.k / one.k, 3.883816593324385, max_relative = 1e-6);
    }

    #[test]
    fn reference_density_at_room_temperature() {
        assert_relative_eq!(reference_density(T), 2.4602e19, max_relative = 1e-4);
    }

    #[test]
    fn missing_references() {
        let mut input = golden();
        input.h2o = None;
        assert_eq!(
            rate_constant(&input),
            Err(RateConstantError::NoH2oReference)
        );
        input.oh = None;
        assert_eq!(rate_constant(&input), Err(RateConstantError::NoOhReference));
        let mut input = golden();
        input.transition_states.clear();
        assert_eq!(
            rate_constant(&input),
            Err(RateConstantError::EmptyEnsemble("transition states"))
        );
        let mut input = golden();
        input.transition_states[0].imaginary = None;
        assert_eq!(
            rate_constant(&input),
            Err(RateConstantError::NoImaginaryFrequency)
        );
    }
}
