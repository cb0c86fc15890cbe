//! Embedding configuration types.

use postapply_core::config::EmbeddingSettings;
use postapply_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding configuration for an index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "hashed", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Custom endpoint for network providers
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds for network providers
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Transport retries for network providers (0 = fail on first error)
    #[serde(default)]
    pub max_retries: u32,
}

fn default_batch_size() -> usize {
    32
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashed".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: default_batch_size(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            batch_size: settings.batch_size,
            endpoint: settings.endpoint.clone(),
            timeout_secs: settings.timeout_secs,
            max_retries: 0,
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions == 0 {
            return Err(AppError::Knowledge(
                "Embedding dimensions must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(AppError::Knowledge(
                "Embedding batch size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
