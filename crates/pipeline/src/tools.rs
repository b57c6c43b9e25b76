//! Tool-augmented generation.
//!
//! When a session carries tools, the engine runs one selection round
//! before answering: the model is shown the tool catalog and asked to
//! either pick one (with its input) or decline. The observation from a
//! chosen tool is appended to the answer context. Tool failures are
//! recovered locally; only cancellation aborts the phase.

use librarian_core::{AppError, AppResult};
use librarian_llm::{CompletionRequest, LanguageModel};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A capability the model may consult before answering, such as
/// location lookup for location-aware questions.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Tool name the model selects by.
    fn name(&self) -> &str;

    /// One-line description shown in the selection prompt.
    fn description(&self) -> &str;

    /// Execute the tool with model-chosen input.
    async fn run(&self, input: &str) -> AppResult<String>;
}

/// Model reply format for the selection round.
#[derive(Debug, Deserialize)]
struct ToolChoice {
    tool: Option<String>,
    #[serde(default)]
    input: String,
}

/// Run the tool selection round and the chosen tool.
///
/// Returns the observation to append to the answer context, or `None`
/// when no tool was chosen or the phase failed recoverably. The only
/// error returned is cancellation.
pub(crate) async fn run_tool_phase(
    model: &Arc<dyn LanguageModel>,
    model_id: &str,
    question: &str,
    tools: &[Arc<dyn Tool>],
    cancel: &CancellationToken,
) -> AppResult<Option<String>> {
    let prompt = selection_prompt(question, tools);
    let request = CompletionRequest::new(prompt, model_id).with_temperature(0.0);

    let completion = tokio::select! {
        _ = cancel.cancelled() => return Err(AppError::Cancelled),
        result = model.complete(&request) => match result {
            Ok(completion) => completion,
            Err(e) => {
                tracing::warn!("Tool selection call failed, answering without tools: {}", e);
                return Ok(None);
            }
        }
    };

    let Some(choice) = parse_choice(&completion.content) else {
        tracing::warn!("Unparseable tool selection reply, answering without tools");
        return Ok(None);
    };

    let Some(name) = choice.tool else {
        return Ok(None);
    };

    let Some(tool) = tools.iter().find(|t| t.name() == name) else {
        tracing::warn!("Model selected unknown tool '{}'", name);
        return Ok(None);
    };

    let observation = tokio::select! {
        _ = cancel.cancelled() => return Err(AppError::Cancelled),
        result = tool.run(&choice.input) => match result {
            Ok(observation) => observation,
            Err(e) => {
                let err = AppError::Tool(format!("'{}' failed: {}", name, e));
                tracing::warn!("{}; answering without its result", err);
                return Ok(None);
            }
        }
    };

    tracing::debug!(tool = name.as_str(), "Tool produced an observation");
    Ok(Some(format!("Tool '{}' reports: {}", name, observation)))
}

fn selection_prompt(question: &str, tools: &[Arc<dyn Tool>]) -> String {
    let mut prompt = String::from(
        "You may consult one tool before answering the question below.\n\nAvailable tools:\n",
    );

    for tool in tools {
        prompt.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
    }

    prompt.push_str(&format!(
        "\nQuestion: {}\n\n\
         Reply with JSON only. To use a tool: {{\"tool\": \"<name>\", \"input\": \"<input>\"}}. \
         If no tool helps: {{\"tool\": null}}.",
        question
    ));

    prompt
}

/// Extract the JSON object from the model reply, tolerating surrounding
/// prose or code fences.
fn parse_choice(reply: &str) -> Option<ToolChoice> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}
