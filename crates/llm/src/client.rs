//! Language-model client abstraction and request/response types.
//!
//! The pipeline issues two kinds of calls: whole completions (question
//! condensation, tool selection) and token-streamed completions (answer
//! generation). Both go through the [`LanguageModel`] trait.

use futures::Stream;
use librarian_core::AppResult;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Rendered prompt text
    pub prompt: String,

    /// Model identifier (e.g., "llama3.2")
    pub model: String,

    /// System prompt (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether the provider should stream tokens
    #[serde(default)]
    pub stream: bool,
}

impl CompletionRequest {
    /// Create a new request with required fields.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system: None,
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Enable token streaming for this request.
    pub fn with_streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Build usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A complete, non-streamed model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text
    pub content: String,

    /// Model that produced the response
    pub model: String,

    /// Usage statistics
    pub usage: TokenUsage,
}

/// One increment of a streamed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenChunk {
    /// Incremental text content
    pub content: String,

    /// Model producing the stream
    pub model: String,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage statistics (final chunk only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Stream of token chunks.
pub type TokenStream = Pin<Box<dyn Stream<Item = AppResult<TokenChunk>> + Send>>;

/// Trait implemented by every model provider.
///
/// Implementations must be cheap to share (`Arc<dyn LanguageModel>`); one
/// instance serves many concurrent sessions.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider name (e.g., "ollama").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming completion.
    async fn complete(&self, request: &CompletionRequest) -> AppResult<Completion>;

    /// Perform a streaming completion.
    ///
    /// Chunks arrive in generation order; the final chunk has
    /// `done == true` and may carry usage statistics.
    async fn stream(&self, request: &CompletionRequest) -> AppResult<TokenStream>;
}
