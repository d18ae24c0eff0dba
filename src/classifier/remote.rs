//! HTTP client for the remote inference service.
//!
//! Sends `POST {endpoint}/predict` with a JSON [`RemoteRequest`] and expects
//! a JSON [`RemoteResponse`]. There is no retry here: a failed call is
//! returned to the caller for that spectrum.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::{RemoteClient, RemoteRequest, RemoteResponse};
use crate::error::{ConfigurationError, RemoteBackendError};

/// Blocking HTTP implementation of [`RemoteClient`].
#[derive(Clone)]
pub struct HttpRemoteClient {
    client: reqwest::blocking::Client,
    url: String,
    /// Bearer token for the inference service
    api_token: Option<String>,
}

impl HttpRemoteClient {
    pub fn new(
        endpoint: &str,
        api_token: Option<String>,
        timeout_seconds: u64,
    ) -> Result<Self, ConfigurationError> {
        if endpoint.trim().is_empty() {
            return Err(ConfigurationError::Invalid(
                "remote classifier endpoint is empty".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ConfigurationError::HttpClient(e.to_string()))?;

        if api_token.is_some() {
            info!("Bearer token authentication configured for remote classifier");
        } else {
            warn!("No authentication configured for remote classifier");
        }

        Ok(Self {
            client,
            url: predict_url(endpoint),
            api_token,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RemoteClient for HttpRemoteClient {
    fn predict(&self, request: &RemoteRequest) -> Result<RemoteResponse, RemoteBackendError> {
        debug!(
            url = %self.url,
            band = %request.band_name,
            features = request.features.len(),
            "Sending remote prediction request"
        );

        let mut builder = self.client.post(&self.url).json(request);
        if let Some(ref token) = self.api_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = builder.send()?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteBackendError::Server {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json::<RemoteResponse>()
            .map_err(|e| RemoteBackendError::MalformedResponse(e.to_string()))
    }
}

fn predict_url(endpoint: &str) -> String {
    format!("{}/predict", endpoint.trim().trim_end_matches('/'))
}
