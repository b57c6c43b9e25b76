//! Chat history types and rendering.

use serde::{Deserialize, Serialize};

/// One prior question/answer exchange in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

impl ChatTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Render chat history as a plain transcript for the condense prompt.
pub fn render_history(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}
