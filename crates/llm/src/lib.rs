//! Language-model integration crate for the librarian answering engine.
//!
//! Provides a provider-agnostic abstraction over chat completion models
//! (non-streaming and token-streaming) and over embedding models. The
//! answering pipeline talks only to the traits defined here; concrete
//! providers live in `providers` and `embed`.
//!
//! # Providers
//! - **Ollama**: local model runtime (completions and embeddings)
//! - **Hash embedder**: deterministic local embeddings for offline use

pub mod client;
pub mod embed;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{Completion, CompletionRequest, LanguageModel, TokenChunk, TokenStream, TokenUsage};
pub use embed::{Embedder, HashEmbedder, OllamaEmbedder};
pub use factory::{create_model, ModelConfig};
pub use providers::OllamaModel;
