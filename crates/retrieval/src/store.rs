//! Vector-store abstraction.

use crate::filter::Filter;
use crate::types::Passage;
use librarian_core::AppResult;

/// Trait for similarity-search backends.
///
/// Implementations run one lookup: the `k` most similar passages to the
/// query vector among those matching the filter. No ordering guarantee
/// beyond descending relevance score. Implementations must be cheap to
/// share (`Arc<dyn VectorStore>`); fan-out issues concurrent searches
/// against one instance.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Search for the top-k most similar passages matching the filter.
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&Filter>,
    ) -> AppResult<Vec<Passage>>;
}
