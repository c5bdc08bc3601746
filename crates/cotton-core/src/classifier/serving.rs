//! Model served over the TensorFlow-Serving REST predict API.
//!
//! `POST {base_url}/v1/models/{model_name}:predict` with
//! `{"instances": [[[[r, g, b], ...], ...]]}`, answered by
//! `{"predictions": [[p0, p1, ...]]}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Model;
use crate::domain::InferenceError;
use crate::preprocess::Tensor;

/// Model server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingConfig {
    /// Model server root, e.g. `http://localhost:8501`
    pub base_url: String,
    pub model_name: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Expected input shape; requests with any other shape are refused locally.
    pub input_shape: Option<[usize; 4]>,
}

impl Default for ServingConfig {
    fn default() -> Self {
        ServingConfig {
            base_url: std::env::var("COTTON_MODEL_URL")
                .unwrap_or_else(|_| "http://localhost:8501".to_string()),
            model_name: std::env::var("COTTON_MODEL_NAME")
                .unwrap_or_else(|_| "cotton_disease".to_string()),
            timeout: Duration::from_secs(10),
            input_shape: None,
        }
    }
}

impl ServingConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn new(base_url: &str, model_name: &str) -> Self {
        ServingConfig {
            base_url: base_url.to_string(),
            model_name: model_name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_input_shape(mut self, shape: [usize; 4]) -> Self {
        self.input_shape = Some(shape);
        self
    }

    pub fn predict_url(&self) -> String {
        format!(
            "{}/v1/models/{}:predict",
            self.base_url.trim_end_matches('/'),
            self.model_name
        )
    }
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<Vec<Vec<Vec<f32>>>>,
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<Vec<f32>>,
}

/// HTTP-backed [`Model`].
pub struct ServingModel {
    config: ServingConfig,
    http_client: reqwest::Client,
}

impl ServingModel {
    pub fn new(config: ServingConfig) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("cotton-doctor/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| InferenceError::Model(format!("http client: {e}")))?;
        Ok(ServingModel {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &ServingConfig {
        &self.config
    }
}

#[async_trait]
impl Model for ServingModel {
    async fn predict(&self, input: &Tensor) -> Result<Vec<f32>, InferenceError> {
        if let Some(expected) = self.config.input_shape {
            if input.shape() != expected {
                return Err(InferenceError::InputShape {
                    shape: input.shape(),
                    expected,
                });
            }
        }

        let url = self.config.predict_url();
        debug!(url = %url, shape = ?input.shape(), "requesting prediction");

        let body = PredictRequest {
            instances: vec![input.rows()],
        };
        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(InferenceError::Model(format!("{status}: {text}")));
        }

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Model(format!("invalid predict response: {e}")))?;

        parsed
            .predictions
            .into_iter()
            .next()
            .ok_or(InferenceError::EmptyOutput)
    }
}
