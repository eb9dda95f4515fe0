/// Embedding provider trait and OpenAI-compatible HTTP implementation
use crate::config::SemanticConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Client initialization failed: {0}")]
    InitializationError(String),

    #[error("Embedding request failed: {0}")]
    RequestError(String),

    #[error("Provider returned {status}: {body}")]
    ProviderError { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for embedding providers
///
/// Implementations turn query text into a fixed-length vector. Calls are
/// blocking and are never retried by callers.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// OpenAI-compatible embeddings client (`POST /v1/embeddings`)
pub struct OpenAiProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model_name: String,
    dimension: usize,
}

impl OpenAiProvider {
    pub fn new(config: &SemanticConfig, api_key: String) -> Result<Self, EmbeddingError> {
        if api_key.trim().is_empty() {
            return Err(EmbeddingError::InitializationError(
                "Empty API credential".to_string(),
            ));
        }

        // No client-side deadline: callers enforce their own.
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()
            .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        tracing::info!(
            "Initializing embedding client: {} ({}D) at {}",
            config.model,
            config.dimensions,
            config.endpoint
        );

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model_name: config.model.clone(),
            dimension: config.dimensions,
        })
    }

    /// Build a provider from the credential named in the config.
    ///
    /// Returns `Ok(None)` when the credential variable is unset or empty,
    /// which leaves semantic search disabled rather than failing startup.
    /// Reporting the missing credential is left to the caller.
    pub fn from_env(config: &SemanticConfig) -> Result<Option<Self>, EmbeddingError> {
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Self::new(config, key).map(Some),
            _ => Ok(None),
        }
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbedRequest {
                model: &self.model_name,
                input: vec![text],
            })
            .send()
            .map_err(|e| EmbeddingError::RequestError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EmbeddingError::ProviderError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::MalformedResponse("No embedding returned".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
