//! Per-question options and session state.

use crate::envelope::RelatedQuestion;
use crate::tools::Tool;
use librarian_llm::ModelConfig;
use librarian_retrieval::Filter;
use std::sync::Arc;
use std::time::Instant;

/// Caller-supplied options for one question.
#[derive(Clone, Default)]
pub struct AskOptions {
    /// Passages to retrieve (site default when absent)
    pub source_count: Option<usize>,

    /// Extra filter AND-combined into every lookup
    pub base_filter: Option<Filter>,

    /// Override for the condensation model
    pub rephrase_model: Option<ModelConfig>,

    /// Private sessions: history is still used for condensation but
    /// never logged or persisted by the pipeline
    pub is_private: bool,

    /// Tools the model may consult before answering
    pub tools: Vec<Arc<dyn Tool>>,

    /// Related questions computed out of band, passed through verbatim
    pub related_questions: Vec<RelatedQuestion>,
}

impl AskOptions {
    pub fn with_source_count(mut self, count: usize) -> Self {
        self.source_count = Some(count);
        self
    }

    pub fn with_base_filter(mut self, filter: Filter) -> Self {
        self.base_filter = Some(filter);
        self
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }
}

/// Transient state of one in-flight question.
///
/// Created when a question arrives and dropped when the envelope is
/// emitted or the session errors out; durability is the caller's
/// responsibility.
pub(crate) struct GenerationSession {
    pub original_question: String,
    pub standalone_question: Option<String>,
    pub is_private: bool,
    pub started_at: Instant,
}

impl GenerationSession {
    pub fn new(question: &str, is_private: bool) -> Self {
        Self {
            original_question: question.to_string(),
            standalone_question: None,
            is_private,
            started_at: Instant::now(),
        }
    }

    /// The question retrieval should use: the standalone rephrasing when
    /// condensation ran, the original otherwise.
    pub fn retrieval_question(&self) -> &str {
        self.standalone_question
            .as_deref()
            .unwrap_or(&self.original_question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = AskOptions::default()
            .with_source_count(8)
            .with_base_filter(Filter::eq("type", "article"))
            .private();

        assert_eq!(options.source_count, Some(8));
        assert!(options.base_filter.is_some());
        assert!(options.is_private);
        assert!(options.tools.is_empty());
    }

    #[test]
    fn test_session_falls_back_to_original_question() {
        let mut session = GenerationSession::new("follow-up?", false);
        assert_eq!(session.retrieval_question(), "follow-up?");

        session.standalone_question = Some("standalone?".to_string());
        assert_eq!(session.retrieval_question(), "standalone?");
    }
}
