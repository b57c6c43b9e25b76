//! Ask command handler.
//!
//! Streams a cited answer to stdout. Ctrl-C cancels the in-flight
//! session cleanly instead of killing the process mid-stream.

use clap::Args;
use librarian_core::{AppError, AppResult, SiteConfig};
use librarian_llm::ModelConfig;
use librarian_pipeline::{
    answer_channel, AnswerEvent, AskOptions, CancellationToken, Engine,
};
use librarian_retrieval::{LanceStore, Retriever};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Ask a question and stream the cited answer
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Path to the site configuration file
    #[arg(short, long)]
    pub site: PathBuf,

    /// Path to the vector store directory
    #[arg(long, default_value = "data/store")]
    pub store: PathBuf,

    /// Number of passages to retrieve (site default when omitted)
    #[arg(long)]
    pub sources: Option<usize>,

    /// Answer model identifier
    #[arg(short, long, default_value = "llama3.2")]
    pub model: String,

    /// Ollama endpoint override
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Embedding model identifier
    #[arg(long, default_value = "nomic-embed-text")]
    pub embedding_model: String,

    /// Embedding dimensions
    #[arg(long, default_value = "768")]
    pub dimensions: usize,

    /// Use the deterministic local embedder instead of Ollama
    #[arg(long)]
    pub local_embeddings: bool,

    /// Private session: the question is never logged
    #[arg(long)]
    pub private: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self) -> AppResult<()> {
        let site = SiteConfig::load(&self.site)?;

        let store = LanceStore::open(&self.store, "passages", self.dimensions).await?;
        let embedder =
            super::build_embedder(self.local_embeddings, &self.embedding_model, self.dimensions)?;
        let retriever = Retriever::new(embedder, Arc::new(store));

        let mut model_config = ModelConfig::ollama(&self.model);
        model_config.endpoint = self.endpoint.clone();
        let model = librarian_llm::create_model(&model_config)?;

        let engine = Arc::new(Engine::new(site, retriever, model, self.model.clone())?);

        let mut options = AskOptions::default();
        options.source_count = self.sources;
        options.is_private = self.private;

        let (sink, mut receiver) = answer_channel(16);
        let cancel = CancellationToken::new();

        // Ctrl-C cancels the session; the engine emits a terminal event.
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });
        }

        let task = {
            let engine = engine.clone();
            let question = self.question.clone();
            tokio::spawn(async move {
                engine
                    .answer(&question, &[], options, sink, cancel)
                    .await
            })
        };

        while let Some(event) = receiver.recv().await {
            match event {
                AnswerEvent::Chunk(text) => {
                    print!("{}", text);
                    std::io::stdout().flush().ok();
                }
                AnswerEvent::Completed(envelope) => {
                    println!();
                    if !envelope.sources.is_empty() {
                        println!("\nSources:");
                        for source in &envelope.sources {
                            println!("  [{}] {}", source.library, source.reference);
                        }
                    }
                    for related in &envelope.related_questions {
                        println!("Related: {} ({})", related.question, related.url);
                    }
                }
                AnswerEvent::Error { code, message } => {
                    println!();
                    eprintln!("{}: {}", code, message);
                }
            }
        }

        // Surface the session result; the join error only happens on panic.
        task.await
            .map_err(|e| AppError::Llm(format!("Session task failed: {}", e)))??;

        Ok(())
    }
}
