//! HTTP embedding backend (Ollama-compatible endpoint).
//!
//! Failure causes map to distinct error kinds so the engine can react per
//! class: request timeouts become infrastructure errors flagged `timeout`,
//! HTTP 429 becomes a budget error, and everything else is a generic
//! infrastructure error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use arbor_core::{defaults, Error, EmbeddingBackend, Result, Vector};

/// Default embedding endpoint.
pub const DEFAULT_EMBED_URL: &str = defaults::EMBED_URL;

/// Default embedding model.
pub const DEFAULT_EMBED_MODEL: &str = defaults::EMBED_MODEL;

/// Default embedding dimension.
pub const DEFAULT_DIMENSION: usize = defaults::EMBED_DIMENSION;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding backend over an Ollama-style `/api/embed` HTTP endpoint.
pub struct HttpEmbeddingBackend {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl HttpEmbeddingBackend {
    /// Create a backend with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config(
            DEFAULT_EMBED_URL.to_string(),
            DEFAULT_EMBED_MODEL.to_string(),
            DEFAULT_DIMENSION,
            defaults::EMBED_TIMEOUT_SECS,
        )
    }

    /// Create a backend with custom configuration.
    pub fn with_config(
        base_url: String,
        model: String,
        dimension: usize,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;

        info!(
            base_url = %base_url,
            model = %model,
            dimension,
            "initializing HTTP embedding backend"
        );

        Ok(Self {
            client,
            base_url,
            model,
            dimension,
        })
    }

    /// Create from environment variables (with defaults).
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `ARBOR_EMBED_URL` | `http://127.0.0.1:11434` |
    /// | `ARBOR_EMBED_MODEL` | `nomic-embed-text` |
    /// | `ARBOR_EMBED_DIM` | `768` |
    /// | `ARBOR_EMBED_TIMEOUT_SECS` | `30` |
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("ARBOR_EMBED_URL").unwrap_or_else(|_| DEFAULT_EMBED_URL.to_string());
        let model =
            std::env::var("ARBOR_EMBED_MODEL").unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string());
        let dimension = std::env::var("ARBOR_EMBED_DIM")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DIMENSION);
        let timeout_secs = std::env::var("ARBOR_EMBED_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::EMBED_TIMEOUT_SECS);

        Self::with_config(base_url, model, dimension, timeout_secs)
    }

    fn map_request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(format!("embedding request timed out: {e}"))
                .with_context("model", &self.model)
        } else {
            Error::infrastructure(format!("embedding request failed: {e}"))
                .with_context("model", &self.model)
        }
    }
}

#[async_trait]
impl EmbeddingBackend for HttpEmbeddingBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(Error::budget_exceeded(
                    "embedding provider rejected the request: quota exceeded",
                )
                .with_context("model", &self.model));
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::infrastructure(format!(
                    "embedding provider returned {status}: {body}"
                ))
                .with_context("model", &self.model));
            }
            _ => {}
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::serialization(format!("invalid embedding response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(Error::infrastructure(format!(
                "embedding count mismatch: sent {}, received {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        for embedding in &parsed.embeddings {
            if embedding.len() != self.dimension {
                return Err(Error::infrastructure(format!(
                    "embedding dimension mismatch: expected {}, received {}",
                    self.dimension,
                    embedding.len()
                ))
                .with_context("model", &self.model));
            }
        }

        debug!(
            input_count = texts.len(),
            model = %self.model,
            "embeddings generated"
        );
        Ok(parsed.embeddings.into_iter().map(Vector::new).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
