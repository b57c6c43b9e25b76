//! Per-site template set, validated at site load time.

use crate::template::PromptTemplate;
use librarian_core::{AppError, AppResult, SiteConfig};
use std::collections::HashMap;

/// Placeholders the pipeline itself provides at render time.
pub const BUILTIN_PLACEHOLDERS: [&str; 3] = ["context", "question", "chat_history"];

/// The compiled condense and answer templates of one site.
///
/// Compiling checks every placeholder: a template referencing a name
/// that is neither a builtin nor a declared site variable fails here,
/// while the site is loading, not while a request is in flight.
pub struct TemplateSet {
    pub condense: PromptTemplate,
    pub answer: PromptTemplate,
}

impl TemplateSet {
    /// Compile and validate both templates of a site.
    pub fn compile(site: &SiteConfig) -> AppResult<Self> {
        let condense = PromptTemplate::compile(&site.condense_template)?;
        let answer = PromptTemplate::compile(&site.answer_template)?;

        for (label, template) in [("condense", &condense), ("answer", &answer)] {
            for placeholder in template.placeholders() {
                let known = BUILTIN_PLACEHOLDERS.contains(&placeholder.as_str())
                    || site.variables.contains_key(placeholder);
                if !known {
                    return Err(AppError::Template(format!(
                        "Site '{}': {} template references unknown variable '{}'",
                        site.site_id, label, placeholder
                    )));
                }
            }
        }

        tracing::debug!("Compiled template set for site '{}'", site.site_id);
        Ok(Self { condense, answer })
    }

    /// Render the condense prompt.
    pub fn render_condense(
        &self,
        site: &SiteConfig,
        question: &str,
        chat_history: &str,
    ) -> AppResult<String> {
        let mut variables = site_variables(site);
        variables.insert("question".to_string(), question.to_string());
        variables.insert("chat_history".to_string(), chat_history.to_string());
        self.condense.render(&variables)
    }

    /// Render the answer prompt.
    pub fn render_answer(
        &self,
        site: &SiteConfig,
        question: &str,
        context: &str,
        chat_history: &str,
    ) -> AppResult<String> {
        let mut variables = site_variables(site);
        variables.insert("question".to_string(), question.to_string());
        variables.insert("context".to_string(), context.to_string());
        variables.insert("chat_history".to_string(), chat_history.to_string());
        self.answer.render(&variables)
    }
}

fn site_variables(site: &SiteConfig) -> HashMap<String, String> {
    site.variables.clone()
}
