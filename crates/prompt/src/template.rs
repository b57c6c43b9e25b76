//! Handlebars template wrapper with placeholder introspection.

use handlebars::Handlebars;
use librarian_core::{AppError, AppResult};
use std::collections::{BTreeSet, HashMap};

const TEMPLATE_NAME: &str = "prompt";

/// A compiled prompt template.
///
/// Compilation extracts the set of `{{name}}` placeholders so the site
/// loader can check them against the known variables before any request
/// is served. Rendering leaves unprovided placeholders as literal text
/// instead of silently dropping them.
#[derive(Debug)]
pub struct PromptTemplate {
    registry: Handlebars<'static>,
    placeholders: BTreeSet<String>,
}

impl PromptTemplate {
    /// Compile a template string.
    pub fn compile(source: &str) -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Plain text prompts, no HTML escaping
        registry.register_escape_fn(handlebars::no_escape);

        registry
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|e| AppError::Template(format!("Failed to compile template: {}", e)))?;

        Ok(Self {
            registry,
            placeholders: extract_placeholders(source),
        })
    }

    /// Placeholder names referenced by this template.
    pub fn placeholders(&self) -> &BTreeSet<String> {
        &self.placeholders
    }

    /// Render with the given variables.
    ///
    /// A placeholder with no value renders as its own literal
    /// `{{name}}` text, so a misconfigured call site is visible in the
    /// output rather than silently truncated.
    pub fn render(&self, variables: &HashMap<String, String>) -> AppResult<String> {
        let mut merged = variables.clone();
        for name in &self.placeholders {
            merged
                .entry(name.clone())
                .or_insert_with(|| format!("{{{{{}}}}}", name));
        }

        self.registry
            .render(TEMPLATE_NAME, &merged)
            .map_err(|e| AppError::Template(format!("Failed to render template: {}", e)))
    }
}

/// Extract simple `{{name}}` placeholders from a template source.
///
/// Only bare identifiers are collected; block helpers and other
/// Handlebars constructs are left to the engine and not validated.
fn extract_placeholders(source: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let token = after[..end].trim();
        if !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            names.insert(token.to_string());
        }
        rest = &after[end + 2..];
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_compile_and_render() {
        let template = PromptTemplate::compile("Question: {{question}}").unwrap();
        let rendered = template.render(&vars(&[("question", "What is Rust?")])).unwrap();
        assert_eq!(rendered, "Question: What is Rust?");
    }

    #[test]
    fn test_placeholder_extraction() {
        let template =
            PromptTemplate::compile("{{context}} then {{ question }} and {{chat_history}}")
                .unwrap();
        let names: Vec<&str> = template.placeholders().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["chat_history", "context", "question"]);
    }

    #[test]
    fn test_missing_value_stays_literal() {
        let template = PromptTemplate::compile("Hello {{assistant_name}}!").unwrap();
        let rendered = template.render(&HashMap::new()).unwrap();
        assert_eq!(rendered, "Hello {{assistant_name}}!");
    }

    #[test]
    fn test_invalid_syntax_rejected() {
        let result = PromptTemplate::compile("{{#if}}broken");
        assert!(matches!(result, Err(AppError::Template(_))));
    }

    #[test]
    fn test_no_html_escaping() {
        let template = PromptTemplate::compile("{{snippet}}").unwrap();
        let rendered = template
            .render(&vars(&[("snippet", "a < b && c > d")]))
            .unwrap();
        assert_eq!(rendered, "a < b && c > d");
    }
}
