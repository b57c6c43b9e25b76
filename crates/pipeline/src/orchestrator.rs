//! Generation orchestration.
//!
//! Drives one question through condense → retrieve → merge → generate,
//! streaming answer chunks to the caller's sink and finishing with the
//! response envelope. The stages are sequential within a session; the
//! only internal parallelism is the retrieval fan-out. Cancellation is
//! raced against every model call and every chunk.

use crate::envelope::{cite_sources, ResponseEnvelope};
use crate::events::{AnswerEvent, AnswerSink};
use crate::session::{AskOptions, GenerationSession};
use crate::tools::run_tool_phase;
use futures::StreamExt;
use librarian_core::{AppError, AppResult, GenerationStage, SiteConfig};
use librarian_llm::{create_model, CompletionRequest, LanguageModel};
use librarian_prompt::{render_history, ChatTurn, TemplateSet};
use librarian_retrieval::{Passage, Retriever};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Answering engine for one site.
///
/// Holds the validated site configuration, its compiled templates, the
/// retriever and the model endpoints. One engine serves many concurrent
/// sessions; all shared state is read-only.
pub struct Engine {
    site: SiteConfig,
    templates: TemplateSet,
    retriever: Retriever,
    model: Arc<dyn LanguageModel>,
    model_id: String,
    rephrase: Arc<dyn LanguageModel>,
    rephrase_id: String,
}

impl Engine {
    /// Build an engine, compiling and validating the site's templates.
    ///
    /// This is the fail-fast point: a template referencing an unknown
    /// variable or an invalid library list never reaches serving.
    pub fn new(
        site: SiteConfig,
        retriever: Retriever,
        model: Arc<dyn LanguageModel>,
        model_id: impl Into<String>,
    ) -> AppResult<Self> {
        site.validate()?;
        let templates = TemplateSet::compile(&site)?;
        let model_id = model_id.into();

        Ok(Self {
            site,
            templates,
            retriever,
            rephrase: model.clone(),
            rephrase_id: model_id.clone(),
            model,
            model_id,
        })
    }

    /// Use a distinct (usually smaller) model for question condensation.
    pub fn with_rephrase_model(
        mut self,
        model: Arc<dyn LanguageModel>,
        model_id: impl Into<String>,
    ) -> Self {
        self.rephrase = model;
        self.rephrase_id = model_id.into();
        self
    }

    /// Answer one question, streaming chunks to the sink.
    ///
    /// Events arrive in generation order and always end with exactly one
    /// terminal event: `Completed` carrying the envelope, or `Error`
    /// with a stable code. The returned result mirrors that terminal
    /// event. Cancelling the token stops in-flight work promptly and
    /// leaves no background tasks.
    pub async fn answer(
        &self,
        question: &str,
        history: &[ChatTurn],
        options: AskOptions,
        sink: AnswerSink,
        cancel: CancellationToken,
    ) -> AppResult<ResponseEnvelope> {
        let result = self.run(question, history, &options, &sink, &cancel).await;

        match &result {
            Ok(envelope) => {
                let _ = sink
                    .send(AnswerEvent::Completed(Box::new(envelope.clone())))
                    .await;
            }
            Err(e) => {
                tracing::warn!(site = self.site.site_id.as_str(), code = e.code(), "Session failed: {}", e);
                let _ = sink.send(AnswerEvent::error_from(e)).await;
            }
        }

        result
    }

    async fn run(
        &self,
        question: &str,
        history: &[ChatTurn],
        options: &AskOptions,
        sink: &AnswerSink,
        cancel: &CancellationToken,
    ) -> AppResult<ResponseEnvelope> {
        let mut session = GenerationSession::new(question, options.is_private);
        let history_text = render_history(history);

        // Condensing: skipped entirely for a fresh conversation.
        if !history.is_empty() {
            let prompt = self
                .templates
                .render_condense(&self.site, question, &history_text)?;
            let (rephrase, rephrase_id) = self.resolve_rephrase(options)?;
            let request = CompletionRequest::new(prompt, rephrase_id).with_temperature(0.0);

            let completion = match cancellable(cancel, rephrase.complete(&request)).await {
                Ok(completion) => completion,
                Err(AppError::Cancelled) => return Err(AppError::Cancelled),
                Err(e) => {
                    return Err(AppError::generation(GenerationStage::Condense, e.to_string()))
                }
            };

            let standalone = completion.content.trim().to_string();
            if !standalone.is_empty() {
                if !session.is_private {
                    tracing::debug!("Condensed question: {}", standalone);
                }
                session.standalone_question = Some(standalone);
            }
        }

        // Retrieving: partial lookup failures are absorbed upstream; a
        // total failure surfaces as a retrieval error.
        let total = options.source_count.unwrap_or(self.site.source_count);
        let passages = cancellable(
            cancel,
            self.retriever.retrieve(
                session.retrieval_question(),
                &self.site.libraries,
                total,
                options.base_filter.as_ref(),
            ),
        )
        .await?;

        // An empty context is valid input; the answer template frames
        // "nothing found" itself.
        let mut context = build_context(&passages);

        if !options.tools.is_empty() {
            if let Some(observation) = run_tool_phase(
                &self.model,
                &self.model_id,
                session.retrieval_question(),
                &options.tools,
                cancel,
            )
            .await?
            {
                if context.is_empty() {
                    context = observation;
                } else {
                    context.push_str("\n\n---\n\n");
                    context.push_str(&observation);
                }
            }
        }

        // Generating: stream chunks in arrival order, one in flight.
        let prompt = self.templates.render_answer(
            &self.site,
            session.retrieval_question(),
            &context,
            &history_text,
        )?;
        let request = CompletionRequest::new(prompt, self.model_id.clone()).with_streaming();

        let mut stream = match cancellable(cancel, self.model.stream(&request)).await {
            Ok(stream) => stream,
            Err(AppError::Cancelled) => return Err(AppError::Cancelled),
            Err(e) => return Err(AppError::generation(GenerationStage::Generate, e.to_string())),
        };

        let mut answer = String::new();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Err(AppError::Cancelled),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    if !chunk.content.is_empty() {
                        answer.push_str(&chunk.content);
                        // The await here is the backpressure: no further
                        // chunk is pulled until the sink accepts this one.
                        if sink.send(AnswerEvent::Chunk(chunk.content)).await.is_err() {
                            return Err(AppError::generation(
                                GenerationStage::Generate,
                                "stream sink closed",
                            ));
                        }
                    }
                    if chunk.done {
                        break;
                    }
                }
                Some(Err(e)) => {
                    return Err(AppError::generation(GenerationStage::Generate, e.to_string()))
                }
                None => break,
            }
        }

        tracing::info!(
            site = self.site.site_id.as_str(),
            passages = passages.len(),
            elapsed_ms = session.started_at.elapsed().as_millis() as u64,
            "Session completed"
        );

        Ok(ResponseEnvelope {
            answer,
            sources: cite_sources(&passages),
            related_questions: options.related_questions.clone(),
            model: self.model_id.clone(),
        })
    }

    fn resolve_rephrase(
        &self,
        options: &AskOptions,
    ) -> AppResult<(Arc<dyn LanguageModel>, String)> {
        match &options.rephrase_model {
            Some(config) => Ok((create_model(config)?, config.model.clone())),
            None => Ok((self.rephrase.clone(), self.rephrase_id.clone())),
        }
    }
}

/// Race a pipeline step against cancellation.
async fn cancellable<T, F>(cancel: &CancellationToken, future: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        result = future => result,
    }
}

/// Render the merged passages as the `{{context}}` value.
fn build_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, passage)| format!("[Document {}]\n{}", i + 1, passage.content))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
