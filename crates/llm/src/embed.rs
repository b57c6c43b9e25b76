//! Embedding providers.
//!
//! The retrieval planner needs the standalone question as a vector before
//! it can fan out similarity lookups. Two providers are included: an
//! Ollama-backed semantic embedder and a deterministic local embedder for
//! offline operation and tests.

use librarian_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 100;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name (e.g., "ollama", "hash").
    fn provider_name(&self) -> &str;

    /// Dimensionality of produced vectors.
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}

/// Request payload for the Ollama embeddings API.
#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

/// Response from the Ollama embeddings API.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Ollama embedding provider (e.g., nomic-embed-text).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create a provider for the given model and expected dimensionality.
    ///
    /// Honors the `OLLAMA_URL` environment variable, falling back to the
    /// local default endpoint.
    pub fn new(model: impl Into<String>, dimensions: usize) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        let base_url =
            std::env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            base_url,
            model: model.into(),
            dimensions,
        })
    }

    async fn embed_once(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to reach Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Ollama embeddings error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse embedding response: {}", e)))?;

        if body.embedding.len() != self.dimensions {
            return Err(AppError::Llm(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                body.embedding.len()
            )));
        }

        Ok(body.embedding)
    }
}

#[async_trait::async_trait]
impl Embedder for OllamaEmbedder {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AppError::Llm("Cannot embed empty text".to_string()));
        }

        let mut last_error = None;
        for attempt in 0..MAX_RETRIES {
            match self.embed_once(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) => {
                    last_error = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt + 1);
                        tracing::warn!(
                            "Embedding failed (attempt {}/{}), retrying in {}ms",
                            attempt + 1,
                            MAX_RETRIES,
                            backoff_ms
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Llm("Unknown embedding error".to_string())))
    }
}

/// Deterministic local embedding provider.
///
/// Hashes character trigrams and whole words into a fixed number of
/// dimensions and normalizes the result to a unit vector. Not
/// semantically accurate like a neural model, but consistent and
/// content-dependent, which is what offline operation and tests need.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Create a provider with the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimensions];
        let lower = text.to_lowercase();

        for word in lower.split_whitespace().filter(|w| w.len() > 2) {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let hash = trigram
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(37).wrapping_add(b as u64));
                embedding[(hash as usize) % self.dimensions] += 1.0;
            }

            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            embedding[(word_hash as usize) % self.dimensions] += 1.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl Embedder for HashEmbedder {
    fn provider_name(&self) -> &str {
        "hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AppError::Llm("Cannot embed empty text".to_string()));
        }
        Ok(self.embed_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("weighted retrieval planning").await.unwrap();
        let b = embedder.embed("weighted retrieval planning").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_hash_embedder_discriminates_content() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("alpha library quotas").await.unwrap();
        let b = embedder.embed("completely different subject").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_hash_embedder_unit_norm() {
        let embedder = HashEmbedder::new(64);
        let v = embedder.embed("normalize this vector").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let embedder = HashEmbedder::new(16);
        assert!(embedder.embed("   ").await.is_err());
    }
}
