//! Index command handler.
//!
//! Reads pre-chunked passages from a JSONL file, embeds them, and
//! inserts them into a LanceDB store in batches.

use clap::Args;
use librarian_core::{AppError, AppResult};
use librarian_llm::Embedder;
use librarian_retrieval::{LanceStore, Passage};
use serde::Deserialize;
use std::path::PathBuf;

/// Passages are inserted in batches of this size.
const BATCH_SIZE: usize = 64;

/// Load passages from a JSONL file into a store
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// JSONL file with one passage object per line
    pub file: PathBuf,

    /// Path to the vector store directory
    #[arg(long, default_value = "data/store")]
    pub store: PathBuf,

    /// Embedding model identifier
    #[arg(long, default_value = "nomic-embed-text")]
    pub embedding_model: String,

    /// Embedding dimensions
    #[arg(long, default_value = "768")]
    pub dimensions: usize,

    /// Use the deterministic local embedder instead of Ollama
    #[arg(long)]
    pub local_embeddings: bool,
}

/// One line of the input file.
#[derive(Debug, Deserialize)]
struct PassageRecord {
    content: String,
    library: String,
    #[serde(default)]
    position: u64,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl IndexCommand {
    /// Execute the index command.
    pub async fn execute(&self) -> AppResult<()> {
        let contents = std::fs::read_to_string(&self.file).map_err(|e| {
            AppError::Config(format!("Failed to read {:?}: {}", self.file, e))
        })?;

        let mut passages = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: PassageRecord = serde_json::from_str(line).map_err(|e| {
                AppError::Config(format!("Invalid passage on line {}: {}", number + 1, e))
            })?;

            let mut passage = Passage::new(record.content, record.library, record.position);
            for (key, value) in record.metadata {
                passage = passage.with_metadata(key, value);
            }
            passages.push(passage);
        }

        if passages.is_empty() {
            return Err(AppError::Config(format!(
                "No passages found in {:?}",
                self.file
            )));
        }

        let store = LanceStore::open(&self.store, "passages", self.dimensions).await?;
        let embedder =
            super::build_embedder(self.local_embeddings, &self.embedding_model, self.dimensions)?;

        let total = passages.len();
        for batch in passages.chunks(BATCH_SIZE) {
            let mut entries = Vec::with_capacity(batch.len());
            for passage in batch {
                let embedding = embedder.embed(&passage.content).await?;
                entries.push((passage.clone(), embedding));
            }
            store.add_passages(&entries).await?;
        }

        println!(
            "Indexed {} passages into {:?} ({} total in store)",
            total,
            self.store,
            store.count().await?
        );

        Ok(())
    }
}
