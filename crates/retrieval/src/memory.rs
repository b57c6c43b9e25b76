//! In-memory vector store.
//!
//! Brute-force cosine similarity over an in-process passage list, with
//! filters evaluated directly against passage metadata. Used by tests
//! and small single-process deployments.

use crate::filter::Filter;
use crate::store::VectorStore;
use crate::types::Passage;
use librarian_core::{AppError, AppResult};
use std::sync::RwLock;

/// In-memory cosine-similarity store.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<(Passage, Vec<f32>)>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a passage with its embedding.
    pub fn add(&self, passage: Passage, embedding: Vec<f32>) -> AppResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::Retrieval("Store lock poisoned".to_string()))?;
        entries.push((passage, embedding));
        Ok(())
    }

    /// Number of stored passages.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl VectorStore for MemoryStore {
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&Filter>,
    ) -> AppResult<Vec<Passage>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::Retrieval("Store lock poisoned".to_string()))?;

        let mut scored: Vec<Passage> = entries
            .iter()
            .filter(|(passage, _)| filter.map(|f| f.matches(passage)).unwrap_or(true))
            .map(|(passage, embedding)| {
                let mut passage = passage.clone();
                passage.score = cosine_similarity(query, embedding);
                passage
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        tracing::debug!("Memory store returned {} passages (top-{})", scored.len(), k);
        Ok(scored)
    }
}

/// Calculate cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LIBRARY_KEY;

    fn store_with_passages() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .add(Passage::new("rust ownership", "guides", 0), vec![1.0, 0.0])
            .unwrap();
        store
            .add(Passage::new("billing faq", "faq", 0), vec![0.0, 1.0])
            .unwrap();
        store
            .add(
                Passage::new("rust lifetimes", "guides", 1),
                vec![0.9, 0.1],
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = store_with_passages();
        let results = store.search(&[1.0, 0.0], 3, None).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].content, "rust ownership");
        assert_eq!(results[1].content, "rust lifetimes");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_search_respects_k() {
        let store = store_with_passages();
        let results = store.search(&[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_search_applies_filter() {
        let store = store_with_passages();
        let filter = Filter::eq(LIBRARY_KEY, "faq");
        let results = store.search(&[1.0, 0.0], 5, Some(&filter)).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].library(), Some("faq"));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
