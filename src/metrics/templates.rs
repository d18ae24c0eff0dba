//! Unit-amplitude peak templates.
//!
//! Every template evaluates to 1.0 at the band center (except literal
//! curves, which are used as stored).

use crate::types::{Band, PeakShape};

/// Gaussian profile `exp(-0.5 * ((x - center) / sigma)^2)`.
///
/// A non-positive width yields an all-zero (degenerate) template.
pub fn gaussian(x: &[f64], center: f64, sigma: f64) -> Vec<f64> {
    if sigma.is_nan() || sigma <= 0.0 {
        return vec![0.0; x.len()];
    }
    x.iter()
        .map(|&xi| {
            let z = (xi - center) / sigma;
            (-0.5 * z * z).exp()
        })
        .collect()
}

/// Lorentzian profile `1 / (1 + ((x - center) / gamma)^2)`.
pub fn lorentzian(x: &[f64], center: f64, gamma: f64) -> Vec<f64> {
    if gamma.is_nan() || gamma <= 0.0 {
        return vec![0.0; x.len()];
    }
    x.iter()
        .map(|&xi| {
            let z = (xi - center) / gamma;
            1.0 / (1.0 + z * z)
        })
        .collect()
}

/// Pseudo-Voigt blend. `eta = 0` is pure Gaussian, `eta = 1` pure Lorentzian.
pub fn pseudo_voigt(x: &[f64], center: f64, sigma: f64, eta: f64) -> Vec<f64> {
    let eta = eta.clamp(0.0, 1.0);
    let g = gaussian(x, center, sigma);
    let l = lorentzian(x, center, sigma);
    g.iter()
        .zip(&l)
        .map(|(g, l)| eta * l + (1.0 - eta) * g)
        .collect()
}

/// Template for `band` sampled on the window axis `x`.
///
/// A literal curve is only used when its length matches the window;
/// otherwise the band falls back to its Gaussian.
pub fn peak_template(x: &[f64], band: &Band) -> Vec<f64> {
    match &band.shape {
        PeakShape::Gaussian => gaussian(x, band.center, band.sigma),
        PeakShape::PseudoVoigt { eta } => pseudo_voigt(x, band.center, band.sigma, *eta),
        PeakShape::Template { curve } if curve.len() == x.len() => curve.clone(),
        PeakShape::Template { .. } => gaussian(x, band.center, band.sigma),
    }
}
