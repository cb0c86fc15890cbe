//! LLM provider factory.
//!
//! Builds a generation client from the `llm` section of the application
//! configuration.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, ScriptedClient};
use crate::types::ProviderType;
use postapply_core::config::LlmSettings;
use postapply_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client from generation settings.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown and `AppError::Llm`
/// if the HTTP client cannot be constructed.
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider).ok_or_else(|| {
        AppError::Config(format!("Unknown provider: {}", settings.provider))
    })?;

    tracing::debug!(provider = provider.as_str(), model = %settings.model, "Creating LLM client");

    match provider {
        ProviderType::Ollama => {
            let base_url = settings
                .endpoint
                .as_deref()
                .unwrap_or(OllamaClient::DEFAULT_BASE_URL);
            let client =
                OllamaClient::with_timeout(base_url, Duration::from_secs(settings.timeout_secs))?;
            Ok(Arc::new(client))
        }
        ProviderType::Echo => Ok(Arc::new(ScriptedClient::echo())),
    }
}
