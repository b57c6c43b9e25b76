//! Command handlers for the librarian CLI.

mod ask;
mod check;
mod index;

pub use ask::AskCommand;
pub use check::CheckCommand;
pub use index::IndexCommand;

use librarian_core::AppResult;
use librarian_llm::{Embedder, HashEmbedder, OllamaEmbedder};
use std::sync::Arc;

/// Build the embedder the ask/index commands share.
pub(crate) fn build_embedder(
    local: bool,
    model: &str,
    dimensions: usize,
) -> AppResult<Arc<dyn Embedder>> {
    if local {
        Ok(Arc::new(HashEmbedder::new(dimensions)))
    } else {
        Ok(Arc::new(OllamaEmbedder::new(model, dimensions)?))
    }
}
