//! Error types for the librarian answering engine.
//!
//! This module defines a unified error enum covering all error categories
//! in the workspace: site configuration, templates, retrieval, generation,
//! deadlines, tools and the underlying model/transport failures.

use thiserror::Error;

/// Pipeline stage in which a generation failure occurred.
///
/// Recorded on [`AppError::Generation`] so callers can distinguish a
/// failed question condensation from a failed answer generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    /// Rephrasing a follow-up question into a standalone one
    Condense,
    /// Producing the final streamed answer
    Generate,
}

impl GenerationStage {
    /// Lowercase stage name, as used in error codes and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Condense => "condense",
            Self::Generate => "generate",
        }
    }
}

impl std::fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the librarian workspace.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Site/library configuration errors (rejected at load time)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prompt template errors (placeholder mismatch, render failure)
    #[error("Template error: {0}")]
    Template(String),

    /// Retrieval errors (every planned lookup failed)
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Language-model failure in a specific pipeline stage
    #[error("Generation failed during {stage}: {message}")]
    Generation {
        stage: GenerationStage,
        message: String,
    },

    /// A guarded operation exceeded its wall-clock budget
    #[error("Operation '{operation}' exceeded its {budget_ms} ms budget")]
    Timeout { operation: String, budget_ms: u64 },

    /// A tool invocation failed
    #[error("Tool error: {0}")]
    Tool(String),

    /// The caller cancelled the session
    #[error("Session cancelled")]
    Cancelled,

    /// Model provider / transport errors outside a pipeline stage
    #[error("LLM error: {0}")]
    Llm(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Stable machine-readable code for this error.
    ///
    /// Stream consumers receive this code on the terminal error event;
    /// it must not change between releases.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration_error",
            Self::Template(_) => "template_error",
            Self::Retrieval(_) => "retrieval_error",
            Self::Generation {
                stage: GenerationStage::Condense,
                ..
            } => "generation_error.condense",
            Self::Generation {
                stage: GenerationStage::Generate,
                ..
            } => "generation_error.generate",
            Self::Timeout { .. } => "timeout_error",
            Self::Tool(_) => "tool_error",
            Self::Cancelled => "cancelled",
            Self::Llm(_) => "llm_error",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
        }
    }

    /// Shorthand for a generation failure in the given stage.
    pub fn generation(stage: GenerationStage, message: impl Into<String>) -> Self {
        Self::Generation {
            stage,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
