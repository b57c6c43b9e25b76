//! Ollama language-model provider.
//!
//! Talks to a local Ollama runtime via its `/api/generate` endpoint.
//! Streaming responses arrive as newline-delimited JSON.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{Completion, CompletionRequest, LanguageModel, TokenChunk, TokenStream, TokenUsage};
use futures::StreamExt;
use librarian_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    stream: bool,
}

/// Ollama API response format (one object per NDJSON line when streaming).
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama-backed [`LanguageModel`].
pub struct OllamaModel {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaModel {
    /// Create a client against the default local endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_ollama_request(&self, request: &CompletionRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            temperature: request.temperature,
            num_predict: request.max_tokens,
            stream: request.stream,
        }
    }

    async fn post_generate(&self, body: &OllamaRequest) -> AppResult<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(body)
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
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

impl Default for OllamaModel {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_chunk_line(line: &str) -> AppResult<TokenChunk> {
    let parsed: OllamaResponse = serde_json::from_str(line)
        .map_err(|e| AppError::Llm(format!("Failed to parse stream chunk: {}", e)))?;

    Ok(TokenChunk {
        content: parsed.response,
        model: parsed.model,
        done: parsed.done,
        usage: if parsed.done {
            Some(TokenUsage::new(
                parsed.prompt_eval_count.unwrap_or(0),
                parsed.eval_count.unwrap_or(0),
            ))
        } else {
            None
        },
    })
}

#[async_trait::async_trait]
impl LanguageModel for OllamaModel {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> AppResult<Completion> {
        tracing::debug!(model = %request.model, "Sending completion request to Ollama");

        let mut body = self.to_ollama_request(request);
        body.stream = false;

        let response = self.post_generate(&body).await?;

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(Completion {
            content: parsed.response,
            model: parsed.model,
            usage: TokenUsage::new(
                parsed.prompt_eval_count.unwrap_or(0),
                parsed.eval_count.unwrap_or(0),
            ),
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> AppResult<TokenStream> {
        tracing::debug!(model = %request.model, "Starting streaming request to Ollama");

        let mut body = self.to_ollama_request(request);
        body.stream = true;

        let response = self.post_generate(&body).await?;

        // NDJSON lines may be split across transport frames; buffer until
        // each newline before parsing.
        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| AppError::Llm(format!("Stream error: {}", e))))
            .scan(String::new(), |buffer, result| {
                let items: Vec<AppResult<TokenChunk>> = match result {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        let mut chunks = Vec::new();
                        while let Some(pos) = buffer.find('\n') {
                            let line = buffer[..pos].trim().to_string();
                            buffer.drain(..=pos);
                            if !line.is_empty() {
                                chunks.push(parse_chunk_line(&line));
                            }
                        }
                        chunks
                    }
                    Err(e) => vec![Err(e)],
                };
                futures::future::ready(Some(futures::stream::iter(items)))
            })
            .flatten();

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let model = OllamaModel::new();
        assert_eq!(model.provider_name(), "ollama");
        assert_eq!(model.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_request_conversion() {
        let model = OllamaModel::new();
        let request = CompletionRequest::new("Hello", "llama3.2")
            .with_temperature(0.3)
            .with_max_tokens(100);

        let body = model.to_ollama_request(&request);
        assert_eq!(body.model, "llama3.2");
        assert_eq!(body.prompt, "Hello");
        assert_eq!(body.temperature, Some(0.3));
        assert_eq!(body.num_predict, Some(100));
        assert!(!body.stream);
    }

    #[test]
    fn test_parse_chunk_line() {
        let line = r#"{"model":"llama3.2","response":"Hi","done":false}"#;
        let chunk = parse_chunk_line(line).unwrap();
        assert_eq!(chunk.content, "Hi");
        assert!(!chunk.done);
        assert!(chunk.usage.is_none());
    }

    #[test]
    fn test_parse_final_chunk_carries_usage() {
        let line = r#"{"model":"llama3.2","response":"","done":true,"prompt_eval_count":12,"eval_count":7}"#;
        let chunk = parse_chunk_line(line).unwrap();
        assert!(chunk.done);
        let usage = chunk.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 7);
        assert_eq!(usage.total_tokens, 19);
    }

    #[test]
    fn test_parse_invalid_chunk_line() {
        assert!(parse_chunk_line("not json").is_err());
    }
}
