//! Retrieval crate for the librarian answering engine.
//!
//! Turns a site's library configuration and a standalone question into a
//! merged, deduplicated passage context:
//!
//! 1. `plan` converts library weights into integer per-library quotas
//!    that sum exactly to the requested total.
//! 2. `filter` builds the typed query filter for each planned lookup.
//! 3. `fanout` executes the lookups against a [`VectorStore`],
//!    concurrently for weighted plans, tolerating partial failures.
//! 4. `merge` deduplicates and caps the combined results.
//!
//! [`Retriever`] ties the steps together behind one call.

pub mod fanout;
pub mod filter;
pub mod lance;
pub mod memory;
pub mod merge;
pub mod plan;
pub mod retriever;
pub mod store;
pub mod types;

// Re-export main types
pub use fanout::execute_plan;
pub use filter::Filter;
pub use lance::LanceStore;
pub use memory::MemoryStore;
pub use merge::merge_passages;
pub use plan::{plan_lookups, Lookup, RetrievalPlan};
pub use retriever::Retriever;
pub use store::VectorStore;
pub use types::Passage;
