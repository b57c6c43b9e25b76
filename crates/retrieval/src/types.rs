//! Passage types shared across the retrieval crate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key naming the library a passage belongs to.
pub const LIBRARY_KEY: &str = "library";

/// Metadata key giving a passage's position within its source document.
pub const POSITION_KEY: &str = "position";

/// A passage returned by a vector store.
///
/// Immutable once returned: downstream stages may drop passages but never
/// mutate them. Metadata is an opaque key/value map that always carries
/// the library identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text
    pub content: String,

    /// Opaque metadata (always includes the library identifier)
    pub metadata: Map<String, Value>,

    /// Index-assigned relevance score
    pub score: f32,
}

impl Passage {
    /// Build a passage with the minimal metadata every store writes.
    pub fn new(content: impl Into<String>, library: impl Into<String>, position: u64) -> Self {
        let mut metadata = Map::new();
        metadata.insert(LIBRARY_KEY.to_string(), Value::String(library.into()));
        metadata.insert(POSITION_KEY.to_string(), Value::from(position));

        Self {
            content: content.into(),
            metadata,
            score: 0.0,
        }
    }

    /// Attach an extra metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The library this passage came from, when present.
    pub fn library(&self) -> Option<&str> {
        self.metadata.get(LIBRARY_KEY).and_then(|v| v.as_str())
    }

    /// The passage's source position, when present.
    pub fn position(&self) -> Option<u64> {
        self.metadata.get(POSITION_KEY).and_then(|v| v.as_u64())
    }

    /// Deduplication key: content + library + position.
    ///
    /// Two passages with the same key are the same document slice even if
    /// their scores differ across lookups.
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.content.clone(),
            self.library().unwrap_or_default().to_string(),
            self.metadata
                .get(POSITION_KEY)
                .map(|v| v.to_string())
                .unwrap_or_default(),
        )
    }
}
