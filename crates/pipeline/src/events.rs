//! Streamed answer events.
//!
//! The engine pushes events into a bounded channel; the caller drains
//! them in order. The channel is the backpressure boundary: the engine
//! awaits every send, so it never holds more than one in-flight chunk
//! and a slow consumer slows generation instead of growing a buffer.

use crate::envelope::ResponseEnvelope;
use librarian_core::AppError;
use tokio::sync::mpsc;

/// One event in the answer stream.
#[derive(Debug, Clone)]
pub enum AnswerEvent {
    /// Incremental answer text, in generation order
    Chunk(String),

    /// Terminal success: the full envelope
    Completed(Box<ResponseEnvelope>),

    /// Terminal failure with a stable error code
    Error { code: String, message: String },
}

impl AnswerEvent {
    /// Terminal error event for the given failure.
    pub fn error_from(err: &AppError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Error { .. })
    }
}

/// Sending half of an answer stream.
pub type AnswerSink = mpsc::Sender<AnswerEvent>;

/// Create a bounded answer channel.
pub fn answer_channel(capacity: usize) -> (AnswerSink, mpsc::Receiver<AnswerEvent>) {
    mpsc::channel(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::GenerationStage;

    #[test]
    fn test_error_event_carries_stable_code() {
        let err = AppError::Retrieval("all lookups failed".to_string());
        let event = AnswerEvent::error_from(&err);

        match event {
            AnswerEvent::Error { code, message } => {
                assert_eq!(code, "retrieval_error");
                assert!(message.contains("all lookups failed"));
            }
            _ => panic!("expected error event"),
        }
    }

    #[test]
    fn test_generation_error_code_includes_stage() {
        let err = AppError::generation(GenerationStage::Condense, "boom");
        match AnswerEvent::error_from(&err) {
            AnswerEvent::Error { code, .. } => assert_eq!(code, "generation_error.condense"),
            _ => panic!("expected error event"),
        }
    }

    #[test]
    fn test_terminal_classification() {
        assert!(!AnswerEvent::Chunk("x".into()).is_terminal());
        assert!(AnswerEvent::Error {
            code: "c".into(),
            message: "m".into()
        }
        .is_terminal());
    }
}
