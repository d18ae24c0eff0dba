//! Pluggable peak classifiers.
//!
//! A [`Classifier`] maps the feature vector of one band window to a
//! `(confidence, similarity)` pair. Exactly one backend is chosen at
//! construction:
//!
//! - `Heuristic`: no collaborators, confidence is the clamped window maximum
//! - `SimilarityModel`: an injected trained model (probability or margin query)
//! - `RemoteQuantum`: a remote inference service reached through a [`RemoteClient`]
//!
//! Unsupported backends and missing collaborators are rejected when the
//! classifier is built, never at prediction time. Values returned by the
//! model-backed variants are passed through unclamped, except that a NaN
//! score is read as 0.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::config::ClassifierConfig;
use crate::error::{ConfigurationError, RemoteBackendError};
use crate::types::Band;

pub mod rbf;
pub mod remote;

/// Similarity reported by backends without an outlier detector.
pub const IN_DISTRIBUTION: f64 = 1.0;

/// Backend identifiers accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierMethod {
    Heuristic,
    SimilarityModel,
    RemoteQuantum,
}

impl std::str::FromStr for ClassifierMethod {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "heuristic" | "dummy" => Ok(ClassifierMethod::Heuristic),
            "similarity" | "similarity-model" | "rbf" => Ok(ClassifierMethod::SimilarityModel),
            "remote" | "remote-quantum" | "qsvm" => Ok(ClassifierMethod::RemoteQuantum),
            _ => Err(ConfigurationError::UnsupportedBackend(s.to_string())),
        }
    }
}

impl std::fmt::Display for ClassifierMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierMethod::Heuristic => write!(f, "heuristic"),
            ClassifierMethod::SimilarityModel => write!(f, "similarity-model"),
            ClassifierMethod::RemoteQuantum => write!(f, "remote-quantum"),
        }
    }
}

/// Which query a trained model answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelQuery {
    /// `score` is the probability of the peak class
    Probability,
    /// `score` is a signed decision margin, mapped through a logistic
    Margin,
}

/// A trained model scoring one feature vector.
#[cfg_attr(test, mockall::automock)]
pub trait SimilarityModel: Send + Sync {
    /// The query this model supports, `None` if it supports neither.
    fn query(&self) -> Option<ModelQuery>;

    /// Score one feature vector according to [`SimilarityModel::query`].
    fn score(&self, features: &[f64]) -> f64;
}

/// Request sent to the remote inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub model_id: String,
    #[serde(rename = "band")]
    pub band_name: String,
    pub features: Vec<f64>,
}

/// Response of the remote inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub confidence: f64,
    #[serde(default, alias = "kappa")]
    pub similarity: Option<f64>,
}

/// Client of the remote inference service. Synchronous; may block on I/O.
#[cfg_attr(test, mockall::automock)]
pub trait RemoteClient: Send + Sync {
    fn predict(&self, request: &RemoteRequest) -> Result<RemoteResponse, RemoteBackendError>;
}

/// Output of one classifier call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub confidence: f64,
    pub similarity: f64,
}

impl Prediction {
    /// NaN never passes a threshold: it becomes 0.
    fn without_nan(self) -> Self {
        Self {
            confidence: if self.confidence.is_nan() { 0.0 } else { self.confidence },
            similarity: if self.similarity.is_nan() { 0.0 } else { self.similarity },
        }
    }

    fn has_nan(&self) -> bool {
        self.confidence.is_nan() || self.similarity.is_nan()
    }
}

/// Collaborators a backend may need, gathered by the caller.
#[derive(Default, Clone)]
pub struct Collaborators {
    pub model: Option<Arc<dyn SimilarityModel>>,
    pub model_id: Option<String>,
    pub client: Option<Arc<dyn RemoteClient>>,
}

/// Unified classifier. The backend is fixed at construction.
#[derive(Clone)]
pub enum Classifier {
    Heuristic,
    SimilarityModel {
        model: Arc<dyn SimilarityModel>,
        query: ModelQuery,
    },
    RemoteQuantum {
        model_id: String,
        client: Arc<dyn RemoteClient>,
    },
}

impl Classifier {
    pub fn heuristic() -> Self {
        Classifier::Heuristic
    }

    /// Wrap a trained model. Fails if the model is missing or answers no query.
    pub fn similarity_model(
        model: Option<Arc<dyn SimilarityModel>>,
    ) -> Result<Self, ConfigurationError> {
        let model = model.ok_or(ConfigurationError::MissingCollaborator {
            backend: "similarity-model",
            collaborator: "trained model",
        })?;
        let query = model.query().ok_or(ConfigurationError::UnsupportedModel)?;
        Ok(Classifier::SimilarityModel { model, query })
    }

    /// Remote backend. Both the model identifier and the client are required.
    pub fn remote_quantum(
        model_id: Option<String>,
        client: Option<Arc<dyn RemoteClient>>,
    ) -> Result<Self, ConfigurationError> {
        let model_id = model_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigurationError::MissingCollaborator {
                backend: "remote-quantum",
                collaborator: "model identifier",
            })?;
        let client = client.ok_or(ConfigurationError::MissingCollaborator {
            backend: "remote-quantum",
            collaborator: "remote client",
        })?;
        Ok(Classifier::RemoteQuantum { model_id, client })
    }

    /// Build a backend from its method name and the available collaborators.
    pub fn from_method(
        method: &str,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigurationError> {
        match method.parse::<ClassifierMethod>()? {
            ClassifierMethod::Heuristic => Ok(Self::heuristic()),
            ClassifierMethod::SimilarityModel => Self::similarity_model(collaborators.model),
            ClassifierMethod::RemoteQuantum => {
                Self::remote_quantum(collaborators.model_id, collaborators.client)
            }
        }
    }

    /// Build the configured backend, loading its model or HTTP client.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ConfigurationError> {
        let method: ClassifierMethod = config.method.parse()?;
        let mut collaborators = Collaborators::default();

        match method {
            ClassifierMethod::Heuristic => {}
            ClassifierMethod::SimilarityModel => {
                if let Some(path) = &config.model_path {
                    let model = rbf::RbfSvmModel::from_path(path)?;
                    collaborators.model = Some(Arc::new(model));
                }
            }
            ClassifierMethod::RemoteQuantum => {
                collaborators.model_id = config.model_id.clone();
                if let Some(endpoint) = &config.endpoint {
                    let client = remote::HttpRemoteClient::new(
                        endpoint,
                        config.api_token.clone(),
                        config.timeout_seconds,
                    )?;
                    collaborators.client = Some(Arc::new(client));
                }
            }
        }

        let classifier = Self::from_method(&config.method, collaborators)?;
        info!(method = %classifier.method(), "Classifier configured");
        Ok(classifier)
    }

    pub fn method(&self) -> ClassifierMethod {
        match self {
            Classifier::Heuristic => ClassifierMethod::Heuristic,
            Classifier::SimilarityModel { .. } => ClassifierMethod::SimilarityModel,
            Classifier::RemoteQuantum { .. } => ClassifierMethod::RemoteQuantum,
        }
    }

    /// Score one band window.
    ///
    /// Only the remote backend can fail; its errors are returned unchanged.
    pub fn predict(&self, features: &[f64], band: &Band) -> Result<Prediction, RemoteBackendError> {
        let prediction = match self {
            Classifier::Heuristic => predict_heuristic(features),
            Classifier::SimilarityModel { model, query } => {
                let score = model.score(features);
                let confidence = match query {
                    ModelQuery::Probability => score,
                    ModelQuery::Margin => logistic(score),
                };
                Prediction {
                    confidence,
                    similarity: IN_DISTRIBUTION,
                }
            }
            Classifier::RemoteQuantum { model_id, client } => {
                let request = RemoteRequest {
                    model_id: model_id.clone(),
                    band_name: band.name.clone(),
                    features: features.to_vec(),
                };
                debug!(band = %band.name, model_id = %model_id, "Calling remote classifier");
                let response = client.predict(&request)?;
                Prediction {
                    confidence: response.confidence,
                    similarity: response.similarity.unwrap_or(IN_DISTRIBUTION),
                }
            }
        };

        let prediction = if prediction.has_nan() {
            warn!(
                band = %band.name,
                method = %self.method(),
                "Classifier returned NaN, scoring as 0"
            );
            prediction.without_nan()
        } else {
            prediction
        };

        trace!(
            band = %band.name,
            confidence = prediction.confidence,
            similarity = prediction.similarity,
            "Classifier prediction"
        );
        Ok(prediction)
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classifier::Heuristic => f.write_str("Classifier::Heuristic"),
            Classifier::SimilarityModel { query, .. } => f
                .debug_struct("Classifier::SimilarityModel")
                .field("query", query)
                .finish_non_exhaustive(),
            Classifier::RemoteQuantum { model_id, .. } => f
                .debug_struct("Classifier::RemoteQuantum")
                .field("model_id", model_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Confidence follows the window maximum; never flags an outlier.
fn predict_heuristic(features: &[f64]) -> Prediction {
    if features.is_empty() {
        return Prediction {
            confidence: 0.0,
            similarity: IN_DISTRIBUTION,
        };
    }
    let peak = features.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Prediction {
        confidence: peak.clamp(0.0, 1.0),
        similarity: IN_DISTRIBUTION,
    }
}

/// `1 / (1 + e^-d)`
pub fn logistic(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BandRole;

    fn band() -> Band {
        Band::new("PF6", 745.0, 8.0, 6.0, BandRole::MustHave, (730.0, 760.0))
    }

    #[test]
    fn test_method_names() {
        assert_eq!("dummy".parse::<ClassifierMethod>().unwrap(), ClassifierMethod::Heuristic);
        assert_eq!("RBF".parse::<ClassifierMethod>().unwrap(), ClassifierMethod::SimilarityModel);
        assert_eq!("qsvm".parse::<ClassifierMethod>().unwrap(), ClassifierMethod::RemoteQuantum);
        assert_eq!(
            "remote_quantum".parse::<ClassifierMethod>().unwrap(),
            ClassifierMethod::RemoteQuantum
        );
    }

    #[test]
    fn test_unsupported_backend_fails_at_construction() {
        let err = Classifier::from_method("knn", Collaborators::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedBackend(ref m) if m == "knn"));
    }

    #[test]
    fn test_heuristic_clamps_maximum() {
        let c = Classifier::heuristic();
        let p = c.predict(&[0.2, 3.5, 0.1], &band()).unwrap();
        assert_eq!(p.confidence, 1.0);
        assert_eq!(p.similarity, 1.0);

        let p = c.predict(&[-2.0, -0.5], &band()).unwrap();
        assert_eq!(p.confidence, 0.0);

        let p = c.predict(&[0.1, 0.4], &band()).unwrap();
        assert_eq!(p.confidence, 0.4);
    }

    #[test]
    fn test_heuristic_empty_features() {
        let p = Classifier::heuristic().predict(&[], &band()).unwrap();
        assert_eq!(p.confidence, 0.0);
        assert_eq!(p.similarity, IN_DISTRIBUTION);
    }

    #[test]
    fn test_similarity_model_missing_fails() {
        let err = Classifier::from_method("rbf", Collaborators::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingCollaborator { .. }));
    }

    #[test]
    fn test_similarity_model_without_query_fails() {
        let mut model = MockSimilarityModel::new();
        model.expect_query().return_const(None::<ModelQuery>);

        let err = Classifier::similarity_model(Some(Arc::new(model))).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedModel));
    }

    #[test]
    fn test_similarity_model_probability_passthrough() {
        let mut model = MockSimilarityModel::new();
        model.expect_query().return_const(Some(ModelQuery::Probability));
        model.expect_score().returning(|_| 0.83);

        let c = Classifier::similarity_model(Some(Arc::new(model))).unwrap();
        let p = c.predict(&[0.1, 0.2], &band()).unwrap();
        assert_eq!(p.confidence, 0.83);
        assert_eq!(p.similarity, 1.0);
    }

    #[test]
    fn test_similarity_model_margin_is_logistic() {
        let mut model = MockSimilarityModel::new();
        model.expect_query().return_const(Some(ModelQuery::Margin));
        model.expect_score().returning(|features| features.iter().sum());

        let c = Classifier::similarity_model(Some(Arc::new(model))).unwrap();
        let p = c.predict(&[0.0, 0.0], &band()).unwrap();
        assert!((p.confidence - 0.5).abs() < 1e-12);

        let p = c.predict(&[1.0, 1.0], &band()).unwrap();
        assert!((p.confidence - 1.0 / (1.0 + (-2.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_nan_scores_read_as_zero() {
        let mut model = MockSimilarityModel::new();
        model.expect_query().return_const(Some(ModelQuery::Probability));
        model.expect_score().returning(|_| f64::NAN);

        let c = Classifier::similarity_model(Some(Arc::new(model))).unwrap();
        let p = c.predict(&[0.1, 0.9], &band()).unwrap();
        assert_eq!(p.confidence, 0.0);
        assert_eq!(p.similarity, IN_DISTRIBUTION);

        let mut client = MockRemoteClient::new();
        client.expect_predict().returning(|_| {
            Ok(RemoteResponse {
                confidence: 0.9,
                similarity: Some(f64::NAN),
            })
        });
        let c = Classifier::remote_quantum(Some("m".into()), Some(Arc::new(client))).unwrap();
        let p = c.predict(&[1.0], &band()).unwrap();
        assert_eq!(p.confidence, 0.9);
        assert_eq!(p.similarity, 0.0);
    }

    #[test]
    fn test_remote_requires_model_id_and_client() {
        let err = Classifier::remote_quantum(None, Some(Arc::new(MockRemoteClient::new())))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingCollaborator { collaborator: "model identifier", .. }
        ));

        let err = Classifier::remote_quantum(Some("qsvm-1".into()), None).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingCollaborator { collaborator: "remote client", .. }
        ));
    }

    #[test]
    fn test_remote_forwards_request_and_response() {
        let mut client = MockRemoteClient::new();
        client
            .expect_predict()
            .withf(|req| req.model_id == "qsvm-1" && req.band_name == "PF6" && req.features == [0.5, 1.0])
            .times(1)
            .returning(|_| {
                Ok(RemoteResponse {
                    confidence: 0.9,
                    similarity: Some(0.5),
                })
            });

        let c = Classifier::remote_quantum(Some("qsvm-1".into()), Some(Arc::new(client))).unwrap();
        let p = c.predict(&[0.5, 1.0], &band()).unwrap();
        assert_eq!(p.confidence, 0.9);
        assert_eq!(p.similarity, 0.5);
    }

    #[test]
    fn test_remote_similarity_defaults_to_one() {
        let mut client = MockRemoteClient::new();
        client.expect_predict().returning(|_| {
            Ok(RemoteResponse {
                confidence: 1.4,
                similarity: None,
            })
        });

        let c = Classifier::remote_quantum(Some("m".into()), Some(Arc::new(client))).unwrap();
        let p = c.predict(&[], &band()).unwrap();
        // remote values are not clamped
        assert_eq!(p.confidence, 1.4);
        assert_eq!(p.similarity, 1.0);
    }

    #[test]
    fn test_remote_error_propagates() {
        let mut client = MockRemoteClient::new();
        client
            .expect_predict()
            .returning(|_| Err(RemoteBackendError::Unavailable("queue full".into())));

        let c = Classifier::remote_quantum(Some("m".into()), Some(Arc::new(client))).unwrap();
        let err = c.predict(&[1.0], &band()).unwrap_err();
        assert!(matches!(err, RemoteBackendError::Unavailable(_)));
    }

    #[test]
    fn test_response_accepts_kappa_alias() {
        let resp: RemoteResponse = serde_json::from_str(r#"{"confidence": 0.7, "kappa": 0.4}"#).unwrap();
        assert_eq!(resp.similarity, Some(0.4));

        let resp: RemoteResponse = serde_json::from_str(r#"{"confidence": 0.7}"#).unwrap();
        assert_eq!(resp.similarity, None);
    }

    #[test]
    fn test_request_wire_shape() {
        let req = RemoteRequest {
            model_id: "m".into(),
            band_name: "PF6".into(),
            features: vec![1.0],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["band"], "PF6");
        assert_eq!(json["model_id"], "m");
    }

    #[test]
    fn test_from_config_heuristic() {
        let config = ClassifierConfig::default();
        let c = Classifier::from_config(&config).unwrap();
        assert_eq!(c.method(), ClassifierMethod::Heuristic);
    }

    #[test]
    fn test_from_config_remote_without_endpoint_fails() {
        let config = ClassifierConfig {
            method: "qsvm".into(),
            model_id: Some("qsvm-1".into()),
            ..Default::default()
        };
        let err = Classifier::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingCollaborator { collaborator: "remote client", .. }
        ));
    }
}
