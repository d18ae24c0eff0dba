//! Pre-trained RBF-kernel SVM.
//!
//! The model is exported by the training pipeline as JSON:
//!
//! ```json
//! {
//!   "gamma": 0.05,
//!   "support_vectors": [[...], [...]],
//!   "dual_coef": [0.8, -0.8],
//!   "intercept": -0.1,
//!   "platt": { "a": -2.1, "b": 0.05 }
//! }
//! ```
//!
//! Only inference happens here. With Platt coefficients the model answers
//! probability queries, otherwise it reports the raw decision margin.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use super::{ModelQuery, SimilarityModel};
use crate::error::ConfigurationError;

/// Platt scaling: `P(peak) = 1 / (1 + exp(a * margin + b))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattScaling {
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RbfSvmModel {
    pub gamma: f64,
    pub support_vectors: Vec<Vec<f64>>,
    /// Signed dual coefficients (`alpha_i * y_i`), one per support vector
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub platt: Option<PlattScaling>,
}

impl RbfSvmModel {
    /// Load and validate a model file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        let load_err = |message: String| ConfigurationError::ModelLoad {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let model: RbfSvmModel =
            serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?;
        model.validate().map_err(load_err)?;

        debug!(
            path = %path.display(),
            support_vectors = model.support_vectors.len(),
            features = model.n_features(),
            "RBF model loaded"
        );
        Ok(model)
    }

    fn validate(&self) -> Result<(), String> {
        if self.gamma.is_nan() || self.gamma <= 0.0 {
            return Err(format!("gamma must be positive, got {}", self.gamma));
        }
        if self.support_vectors.is_empty() {
            return Err("model has no support vectors".to_string());
        }
        if self.dual_coef.len() != self.support_vectors.len() {
            return Err(format!(
                "{} dual coefficients for {} support vectors",
                self.dual_coef.len(),
                self.support_vectors.len()
            ));
        }
        let dim = self.n_features();
        if self.support_vectors.iter().any(|sv| sv.len() != dim) {
            return Err("support vectors differ in dimension".to_string());
        }
        Ok(())
    }

    /// Feature dimension the model was trained on.
    pub fn n_features(&self) -> usize {
        self.support_vectors.first().map(Vec::len).unwrap_or(0)
    }

    /// `sum_i dual_coef_i * exp(-gamma * |x - sv_i|^2) + intercept`,
    /// `None` if `x` has the wrong dimension.
    pub fn decision_function(&self, x: &[f64]) -> Option<f64> {
        if x.len() != self.n_features() {
            return None;
        }
        let kernel_sum: f64 = self
            .support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, coef)| {
                let dist2: f64 = sv.iter().zip(x).map(|(s, v)| (s - v) * (s - v)).sum();
                coef * (-self.gamma * dist2).exp()
            })
            .sum();
        Some(kernel_sum + self.intercept)
    }
}

impl SimilarityModel for RbfSvmModel {
    fn query(&self) -> Option<ModelQuery> {
        if self.platt.is_some() {
            Some(ModelQuery::Probability)
        } else {
            Some(ModelQuery::Margin)
        }
    }

    /// A window of the wrong length scores as "no peak".
    fn score(&self, features: &[f64]) -> f64 {
        let Some(margin) = self.decision_function(features) else {
            warn!(
                expected = self.n_features(),
                got = features.len(),
                "Feature dimension mismatch, scoring as no peak"
            );
            return match self.platt {
                Some(_) => 0.0,
                None => f64::NEG_INFINITY,
            };
        };

        match self.platt {
            Some(PlattScaling { a, b }) => 1.0 / (1.0 + (a * margin + b).exp()),
            None => margin,
        }
    }
}
