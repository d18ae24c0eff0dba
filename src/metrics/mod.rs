//! Band metric computation.
//!
//! Per band window this module estimates the peak center and its offset
//! from the expected position, a robust baseline-corrected SNR, and the
//! RMSE of a closed-form amplitude fit against the band's peak template.
//!
//! Degenerate windows never raise: they yield sentinel values
//! (undefined center, SNR = 0, RMSE = 1.0).

pub mod templates;

use serde::{Deserialize, Serialize};

use crate::spectrum::Window;
use crate::types::Band;

/// Scale turning a median absolute deviation into a Gaussian sigma.
pub const MAD_SCALE: f64 = 1.4826;

/// Lower bound of the noise estimate.
pub const NOISE_FLOOR: f64 = 1e-9;

/// Squared template norm below which a template counts as degenerate.
pub const DEGENERATE_NORM: f64 = 1e-12;

/// RMSE reported for a window without samples (maximal badness).
pub const EMPTY_WINDOW_RMSE: f64 = 1.0;

/// Minimum number of samples left outside the peak region for a noise estimate.
const MIN_NOISE_SAMPLES: usize = 3;

/// Signal metrics of one band window, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub center: Option<f64>,
    pub offset: Option<f64>,
    pub snr: f64,
    pub rmse: f64,
}

/// Compute all signal metrics of `window` for `band`.
pub fn compute(window: &Window, band: &Band) -> WindowMetrics {
    let center = estimate_center(window);
    WindowMetrics {
        center,
        offset: center_offset(center, band),
        snr: robust_snr(&window.intensities),
        rmse: fit_template(window, band).rmse,
    }
}

/// Wavenumber at the intensity maximum, undefined for an empty window.
pub fn estimate_center(window: &Window) -> Option<f64> {
    argmax(&window.intensities).map(|idx| window.wavenumbers[idx])
}

/// Offset of the observed center from the expected one.
pub fn center_offset(center: Option<f64>, band: &Band) -> Option<f64> {
    center.map(|c| c - band.center)
}

/// Robust, baseline-corrected signal-to-noise ratio.
///
/// The baseline is the window median. Noise is the scaled MAD of the
/// residual outside a region of `max(1, n / 10)` samples either side of the
/// peak; with fewer than three samples left, the whole window is used.
pub fn robust_snr(intensities: &[f64]) -> f64 {
    if intensities.is_empty() {
        return 0.0;
    }

    let baseline = median(intensities);
    let residual: Vec<f64> = intensities.iter().map(|y| y - baseline).collect();

    let Some(peak_idx) = argmax(&residual) else {
        return 0.0;
    };
    let peak_height = residual[peak_idx];
    if peak_height.is_nan() || peak_height <= 0.0 {
        return 0.0;
    }

    let n = residual.len();
    let half_width = (n / 10).max(1);
    let left = peak_idx.saturating_sub(half_width);
    let right = (peak_idx + half_width + 1).min(n);

    let mut noise: Vec<f64> = residual[..left]
        .iter()
        .chain(&residual[right..])
        .copied()
        .collect();
    if noise.len() < MIN_NOISE_SAMPLES {
        let center = median(&residual);
        noise = residual.iter().map(|r| r - center).collect();
    }

    let noise_scale = (MAD_SCALE * median_absolute_deviation(&noise)).max(NOISE_FLOOR);
    let snr = peak_height / noise_scale;
    if snr.is_nan() {
        0.0
    } else {
        snr
    }
}

/// Outcome of fitting `baseline + amplitude * template` to a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemplateFit {
    pub baseline: f64,
    /// `None` when the window is empty or the template is degenerate
    pub amplitude: Option<f64>,
    pub rmse: f64,
}

/// Closed-form least-squares amplitude fit against the band template.
///
/// `amplitude = <g, y - baseline> / <g, g>`, clamped to the band's fit
/// limits. A degenerate template reports the RMS roughness around the
/// baseline instead.
pub fn fit_template(window: &Window, band: &Band) -> TemplateFit {
    if window.is_empty() {
        return TemplateFit {
            baseline: 0.0,
            amplitude: None,
            rmse: EMPTY_WINDOW_RMSE,
        };
    }

    let y = &window.intensities;
    let baseline = median(y);
    let g = templates::peak_template(&window.wavenumbers, band);

    let norm_g2 = dot(&g, &g);
    if norm_g2.is_nan() || norm_g2 <= DEGENERATE_NORM {
        let rmse = root_mean_square(y.iter().map(|yi| yi - baseline));
        return TemplateFit {
            baseline,
            amplitude: None,
            rmse: sanitize_rmse(rmse),
        };
    }

    let numerator: f64 = g.iter().zip(y).map(|(gi, yi)| gi * (yi - baseline)).sum();
    let mut amplitude = numerator / norm_g2;
    if let Some(limits) = &band.fit_limits {
        amplitude = limits.clamp_amplitude(amplitude);
    }

    let rmse = root_mean_square(
        y.iter()
            .zip(&g)
            .map(|(yi, gi)| yi - (baseline + amplitude * gi)),
    );

    TemplateFit {
        baseline,
        amplitude: Some(amplitude),
        rmse: sanitize_rmse(rmse),
    }
}

/// Median of a slice; NaN for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let count = sorted.len();
    if count % 2 == 0 {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    } else {
        sorted[count / 2]
    }
}

/// Median absolute deviation from the sample's own median.
pub fn median_absolute_deviation(values: &[f64]) -> f64 {
    let center = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Index of the first maximum, ignoring NaN; `None` for an empty slice.
fn argmax(values: &[f64]) -> Option<usize> {
    if values.is_empty() {
        return None;
    }
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] || values[best].is_nan() {
            best = i;
        }
    }
    Some(best)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn root_mean_square(residuals: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = residuals.len();
    if n == 0 {
        return 0.0;
    }
    let sum_sq: f64 = residuals.map(|r| r * r).sum();
    (sum_sq / n as f64).sqrt()
}

/// Malformed samples must still produce a usable (maximally bad) fit.
fn sanitize_rmse(rmse: f64) -> f64 {
    if rmse.is_nan() {
        EMPTY_WINDOW_RMSE
    } else {
        rmse
    }
}
