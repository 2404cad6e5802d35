//! Generation provider factory.
//!
//! Resolves a provider name from configuration into a concrete client.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use crate::types::ProviderType;
use radar_core::config::ChatSettings;
use radar_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a generation client from chat settings.
///
/// # Errors
/// Returns `AppError::Llm` if the provider is unknown or the HTTP client
/// cannot be built.
pub fn create_client(settings: &ChatSettings, timeout: Duration) -> AppResult<Arc<dyn LlmClient>> {
    match ProviderType::parse(&settings.provider) {
        Some(ProviderType::Ollama) => {
            let client = OllamaClient::with_timeout(&settings.endpoint, timeout)?;
            Ok(Arc::new(client))
        }
        None => Err(AppError::Llm(format!(
            "Unknown provider: {}",
            settings.provider
        ))),
    }
}
