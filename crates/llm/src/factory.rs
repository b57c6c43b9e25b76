//! Model provider factory.
//!
//! Resolves a [`ModelConfig`] into a shareable [`LanguageModel`] instance.

use crate::client::LanguageModel;
use crate::providers::OllamaModel;
use librarian_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for one model endpoint.
///
/// The pipeline holds two of these: the main answering model and an
/// optional, usually smaller, rephrase model for question condensation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider identifier ("ollama")
    pub provider: String,

    /// Model identifier (e.g., "llama3.2")
    pub model: String,

    /// Custom endpoint URL (provider default when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl ModelConfig {
    /// Ollama-backed model with the default local endpoint.
    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            provider: "ollama".to_string(),
            model: model.into(),
            endpoint: None,
        }
    }
}

/// Create a language-model client for the given configuration.
///
/// # Errors
/// Returns `AppError::Config` for unknown providers.
pub fn create_model(config: &ModelConfig) -> AppResult<Arc<dyn LanguageModel>> {
    match config.provider.to_lowercase().as_str() {
        "ollama" => {
            let model = match &config.endpoint {
                Some(endpoint) => OllamaModel::with_base_url(endpoint),
                None => OllamaModel::new(),
            };
            Ok(Arc::new(model))
        }
        other => Err(AppError::Config(format!(
            "Unknown model provider: {}",
            other
        ))),
    }
}
