//! Core types for the Raman QC engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// What a band means for the sample decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BandRole {
    /// Must appear near its expected location
    MustHave,
    /// Must not appear as a peak
    MustNot,
    /// Reference band, informational only
    Anchor,
    /// Monitored band, informational only
    Watch,
}

impl BandRole {
    /// Parse a role token, accepting both `must-have` and `must_have` spellings.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().replace('_', "-").as_str() {
            "must-have" => Some(BandRole::MustHave),
            "must-not" => Some(BandRole::MustNot),
            "anchor" => Some(BandRole::Anchor),
            "watch" => Some(BandRole::Watch),
            _ => None,
        }
    }
}

impl std::fmt::Display for BandRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BandRole::MustHave => write!(f, "must-have"),
            BandRole::MustNot => write!(f, "must-not"),
            BandRole::Anchor => write!(f, "anchor"),
            BandRole::Watch => write!(f, "watch"),
        }
    }
}

/// Expected peak profile of a band. Each variant carries only its own parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum PeakShape {
    #[default]
    Gaussian,
    /// `eta * Lorentzian + (1 - eta) * Gaussian`, same center and width.
    PseudoVoigt { eta: f64 },
    /// Literal curve sampled on the band window (e.g. from calibration).
    Template { curve: Vec<f64> },
}

impl PeakShape {
    pub const DEFAULT_ETA: f64 = 0.5;

    /// Blended shape with the mixing factor clamped to [0, 1].
    pub fn pseudo_voigt(eta: Option<f64>) -> Self {
        let eta = eta.unwrap_or(Self::DEFAULT_ETA);
        let eta = if eta.is_nan() { Self::DEFAULT_ETA } else { eta.clamp(0.0, 1.0) };
        PeakShape::PseudoVoigt { eta }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PeakShape::Gaussian => "gaussian",
            PeakShape::PseudoVoigt { .. } => "pseudovoigt",
            PeakShape::Template { .. } => "template",
        }
    }
}

/// Physical constraints for the amplitude fit. Either bound is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FitLimits {
    pub amp_min: Option<f64>,
    pub amp_max: Option<f64>,
    pub sigma_min: Option<f64>,
    pub sigma_max: Option<f64>,
}

impl FitLimits {
    /// Clamp an amplitude into the configured bounds.
    pub fn clamp_amplitude(&self, amplitude: f64) -> f64 {
        let mut amp = amplitude;
        if let Some(min) = self.amp_min {
            amp = amp.max(min);
        }
        if let Some(max) = self.amp_max {
            amp = amp.min(max);
        }
        amp
    }
}

/// A named expected spectral feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub name: String,
    /// Expected center (cm^-1)
    pub center: f64,
    /// Allowed |offset| before the peak counts as drifted
    pub tol: f64,
    /// Width parameter shared by the Gaussian and Lorentzian templates
    pub sigma: f64,
    pub role: BandRole,
    pub window_min: f64,
    pub window_max: f64,
    #[serde(flatten)]
    pub shape: PeakShape,
    pub fit_limits: Option<FitLimits>,
    pub notes: Option<String>,
}

impl Band {
    pub fn new(
        name: impl Into<String>,
        center: f64,
        tol: f64,
        sigma: f64,
        role: BandRole,
        window: (f64, f64),
    ) -> Self {
        Self {
            name: name.into(),
            center,
            tol,
            sigma,
            role,
            window_min: window.0,
            window_max: window.1,
            shape: PeakShape::Gaussian,
            fit_limits: None,
            notes: None,
        }
    }

    pub fn with_shape(mut self, shape: PeakShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_fit_limits(mut self, limits: FitLimits) -> Self {
        self.fit_limits = Some(limits);
        self
    }

    pub fn contains(&self, wavenumber: f64) -> bool {
        wavenumber >= self.window_min && wavenumber <= self.window_max
    }
}

/// Global decision thresholds of a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Maximum template-fit RMSE
    pub epsilon: f64,
    /// Minimum classifier confidence
    pub tau: f64,
    /// Minimum similarity score
    pub kappa_min: f64,
    pub snr_min: f64,
}

/// Per-station, per-product QC recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub version: String,
    pub station: String,
    pub bands: Vec<Band>,
    pub thresholds: Thresholds,
    pub notes: Option<String>,
}

/// Semantic state of a band after evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BandLabel {
    /// Out of distribution (similarity < kappa_min)
    Ood,
    /// SNR < snr_min or RMSE > epsilon
    BadQuality,
    /// No reliable peak (confidence < tau)
    NoPeak,
    /// Peak present but |offset| > tol
    PeakDrifted,
    PeakOk,
    /// Forbidden band appears as a peak
    MustNotHit,
}

impl BandLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BandLabel::Ood => "OOD",
            BandLabel::BadQuality => "BAD_QUALITY",
            BandLabel::NoPeak => "NO_PEAK",
            BandLabel::PeakDrifted => "PEAK_DRIFTED",
            BandLabel::PeakOk => "PEAK_OK",
            BandLabel::MustNotHit => "MUST_NOT_HIT",
        }
    }

    /// True for labels that mean a peak was found.
    pub fn is_peak(&self) -> bool {
        matches!(self, BandLabel::PeakOk | BandLabel::PeakDrifted)
    }
}

impl std::fmt::Display for BandLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw metrics for one band window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandMetrics {
    /// Observed peak center, undefined for an empty window
    pub center: Option<f64>,
    /// `center - band.center`
    pub offset: Option<f64>,
    pub snr: f64,
    pub rmse: f64,
    pub confidence: f64,
    pub similarity: f64,
}

/// Full result for one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandResult {
    pub band: Band,
    pub label: BandLabel,
    pub metrics: BandMetrics,
    pub reasons: Vec<String>,
}

/// Sample-level verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Green,
    Amber,
    Red,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Green => write!(f, "GREEN"),
            Decision::Amber => write!(f, "AMBER"),
            Decision::Red => write!(f, "RED"),
        }
    }
}

/// Aggregated decision for one spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    pub recipe: Recipe,
    pub bands: Vec<BandResult>,
    pub decision: Decision,
    pub reasons: Vec<String>,
}

/// Envelope written by the CLI around one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub schema_version: String,
    pub report_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub engine_version: String,
    pub station: Option<String>,
    pub classifier: String,
    pub spectrum_path: PathBuf,
    pub recipe_hash: Option<String>,
    pub result: SampleResult,
}
