//! Final response envelope and citation building.

use librarian_retrieval::Passage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum snippet length for source references.
const MAX_SNIPPET_LENGTH: usize = 150;

/// A source citation surfaced alongside the answer.
///
/// This is the user-facing representation of where information came
/// from; scores and raw metadata stay internal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Library the passage came from
    pub library: String,

    /// Human-readable source name (document title or file name)
    pub reference: String,

    /// Short snippet showing the relevant evidence
    pub snippet: String,
}

/// A related-question link.
///
/// Computed by an out-of-band job; the pipeline only passes these
/// through when the caller supplies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedQuestion {
    pub question: String,
    pub url: String,
}

/// The terminal result of one answered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Full answer text (concatenation of the streamed chunks)
    pub answer: String,

    /// Citations drawn from the merged context, in context order
    pub sources: Vec<SourceRef>,

    /// Pass-through related questions, when supplied
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_questions: Vec<RelatedQuestion>,

    /// Model that produced the answer
    pub model: String,
}

/// Build citations from the merged context.
///
/// Deduplicates by (library, reference) while preserving context order,
/// so the first (highest-priority) occurrence of a source wins.
pub fn cite_sources(passages: &[Passage]) -> Vec<SourceRef> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for passage in passages {
        let library = passage.library().unwrap_or_default().to_string();
        let reference = source_reference(passage);

        if seen.insert((library.clone(), reference.clone())) {
            sources.push(SourceRef {
                library,
                reference,
                snippet: truncate_snippet(&passage.content, MAX_SNIPPET_LENGTH),
            });
        }
    }

    sources
}

/// Human-readable source name from passage metadata.
fn source_reference(passage: &Passage) -> String {
    for key in ["source", "title", "url"] {
        if let Some(value) = passage.metadata.get(key).and_then(|v| v.as_str()) {
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    match (passage.library(), passage.position()) {
        (Some(library), Some(position)) => format!("{} #{}", library, position),
        (Some(library), None) => library.to_string(),
        _ => "unknown".to_string(),
    }
}

/// Truncate a snippet at a word boundary.
fn truncate_snippet(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_len).collect();
    match truncated.rfind(char::is_whitespace) {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cite_sources_deduplicates_by_source() {
        let passages = vec![
            Passage::new("first slice", "guides", 0)
                .with_metadata("source", json!("install.md")),
            Passage::new("second slice", "guides", 1)
                .with_metadata("source", json!("install.md")),
            Passage::new("faq entry", "faq", 0).with_metadata("source", json!("billing.md")),
        ];

        let sources = cite_sources(&passages);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].reference, "install.md");
        assert_eq!(sources[1].reference, "billing.md");
    }

    #[test]
    fn test_cite_sources_preserves_context_order() {
        let passages = vec![
            Passage::new("a", "heavy", 0).with_metadata("source", json!("h.md")),
            Passage::new("b", "light", 0).with_metadata("source", json!("l.md")),
        ];

        let sources = cite_sources(&passages);
        assert_eq!(sources[0].library, "heavy");
        assert_eq!(sources[1].library, "light");
    }

    #[test]
    fn test_source_reference_fallback() {
        let passage = Passage::new("text", "guides", 7);
        assert_eq!(source_reference(&passage), "guides #7");
    }

    #[test]
    fn test_truncate_snippet_short_text() {
        assert_eq!(truncate_snippet("short", 100), "short");
    }

    #[test]
    fn test_truncate_snippet_breaks_at_word() {
        let long = "This is a very long text that needs to be cut at some point soon";
        let result = truncate_snippet(long, 30);
        assert!(result.len() <= 33);
        assert!(result.ends_with("..."));
        assert!(!result.contains("cut at some point"));
    }

    #[test]
    fn test_envelope_serialization_skips_empty_related() {
        let envelope = ResponseEnvelope {
            answer: "text".to_string(),
            sources: vec![],
            related_questions: vec![],
            model: "llama3.2".to_string(),
        };

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(!json.contains("related_questions"));
    }
}
