//! Retriever facade: question in, merged passage context out.

use crate::fanout::execute_plan;
use crate::filter::Filter;
use crate::merge::merge_passages;
use crate::plan::plan_lookups;
use crate::store::VectorStore;
use crate::types::Passage;
use librarian_core::{AppError, AppResult, LibrarySpec};
use librarian_llm::Embedder;
use std::sync::Arc;

/// Plans, executes and merges the lookups for one question.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    /// Create a retriever over the given embedder and store.
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Retrieve up to `total` passages relevant to the question.
    ///
    /// The question is embedded once; the resulting vector drives every
    /// planned lookup. Partial lookup failures are absorbed upstream;
    /// an empty result is valid and the caller decides how to frame it.
    pub async fn retrieve(
        &self,
        question: &str,
        libraries: &[LibrarySpec],
        total: usize,
        base_filter: Option<&Filter>,
    ) -> AppResult<Vec<Passage>> {
        let plan = plan_lookups(total, base_filter, libraries)?;

        let query = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to embed query: {}", e)))?;

        let slots = execute_plan(self.store.clone(), &query, &plan).await?;
        let merged = merge_passages(slots, total);

        tracing::debug!(
            lookups = plan.lookups.len(),
            passages = merged.len(),
            "Retrieval complete"
        );

        Ok(merged)
    }
}
