//! Evaluation pipeline.
//!
//! For every band of a recipe, in declared order:
//! window extraction -> metrics -> classifier -> label decision.
//! The ordered band results are then aggregated into the sample decision.

use tracing::{debug, info};

use crate::classifier::Classifier;
use crate::decision;
use crate::error::RemoteBackendError;
use crate::metrics;
use crate::spectrum::{self, Spectrum};
use crate::types::{Band, BandMetrics, BandResult, Recipe, SampleResult};

/// Evaluate one spectrum against a recipe.
///
/// Only a remote classifier can fail; the error aborts this spectrum and is
/// returned unchanged. Degenerate windows never fail, they produce sentinel
/// metrics and still get a label.
pub fn evaluate(
    wavenumbers: &[f64],
    intensities: &[f64],
    recipe: &Recipe,
    classifier: &Classifier,
) -> Result<SampleResult, RemoteBackendError> {
    let bands = recipe
        .bands
        .iter()
        .map(|band| evaluate_band(wavenumbers, intensities, band, recipe, classifier))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(finish(recipe, bands))
}

/// Same as [`evaluate`], with the bands scored concurrently.
///
/// Band results still come back in recipe order.
#[cfg(feature = "parallel")]
pub fn evaluate_parallel(
    wavenumbers: &[f64],
    intensities: &[f64],
    recipe: &Recipe,
    classifier: &Classifier,
) -> Result<SampleResult, RemoteBackendError> {
    use rayon::prelude::*;

    let bands = recipe
        .bands
        .par_iter()
        .map(|band| evaluate_band(wavenumbers, intensities, band, recipe, classifier))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(finish(recipe, bands))
}

/// Convenience wrapper for a loaded [`Spectrum`].
pub fn evaluate_spectrum(
    spectrum: &Spectrum,
    recipe: &Recipe,
    classifier: &Classifier,
) -> Result<SampleResult, RemoteBackendError> {
    #[cfg(feature = "parallel")]
    {
        evaluate_parallel(&spectrum.wavenumbers, &spectrum.intensities, recipe, classifier)
    }
    #[cfg(not(feature = "parallel"))]
    {
        evaluate(&spectrum.wavenumbers, &spectrum.intensities, recipe, classifier)
    }
}

/// Window, metrics, classifier and label for a single band.
pub fn evaluate_band(
    wavenumbers: &[f64],
    intensities: &[f64],
    band: &Band,
    recipe: &Recipe,
    classifier: &Classifier,
) -> Result<BandResult, RemoteBackendError> {
    let window = spectrum::extract_window(wavenumbers, intensities, band);
    let signal = metrics::compute(&window, band);
    let prediction = classifier.predict(&window.intensities, band)?;

    let metrics = BandMetrics {
        center: signal.center,
        offset: signal.offset,
        snr: signal.snr,
        rmse: signal.rmse,
        confidence: prediction.confidence,
        similarity: prediction.similarity,
    };
    let decision = decision::decide(band, &recipe.thresholds, &metrics);

    debug!(
        band = %band.name,
        role = %band.role,
        points = window.len(),
        label = %decision.label,
        snr = metrics.snr,
        rmse = metrics.rmse,
        confidence = metrics.confidence,
        "Band evaluated"
    );

    Ok(BandResult {
        band: band.clone(),
        label: decision.label,
        metrics,
        reasons: decision.reasons,
    })
}

fn finish(recipe: &Recipe, bands: Vec<BandResult>) -> SampleResult {
    let result = decision::aggregate(recipe, bands);
    info!(
        recipe = %recipe.name,
        version = %recipe.version,
        decision = %result.decision,
        reasons = result.reasons.len(),
        "Sample evaluated"
    );
    result
}
