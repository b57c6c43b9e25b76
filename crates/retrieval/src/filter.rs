//! Typed query filters for vector-store lookups.
//!
//! Filters are a small algebraic type rather than an untyped nested map,
//! so the composer here and every store adapter share one contract. A
//! composed expression is opaque to the rest of the pipeline: stores
//! translate it (SQL predicate, in-process evaluation) however they like.

use crate::types::{Passage, LIBRARY_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured query filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Field equals value
    Eq { field: String, value: Value },

    /// Field is one of the listed values
    In { field: String, values: Vec<Value> },

    /// All sub-filters hold
    And(Vec<Filter>),
}

impl Filter {
    /// Equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Membership filter.
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            field: field.into(),
            values,
        }
    }

    /// Conjunction of filters.
    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    /// Evaluate this filter against a passage's metadata.
    ///
    /// Used by in-process stores and by adapters that cannot push every
    /// predicate down to their backend.
    pub fn matches(&self, passage: &Passage) -> bool {
        match self {
            Self::Eq { field, value } => passage.metadata.get(field) == Some(value),
            Self::In { field, values } => passage
                .metadata
                .get(field)
                .map(|v| values.contains(v))
                .unwrap_or(false),
            Self::And(filters) => filters.iter().all(|f| f.matches(passage)),
        }
    }
}

/// Filter for the single unweighted lookup: `library IN {names}`,
/// AND-combined with the base filter when present.
pub fn for_library_set(base: Option<&Filter>, names: &[String]) -> Filter {
    let libraries = Filter::is_in(
        LIBRARY_KEY,
        names.iter().map(|n| Value::String(n.clone())).collect(),
    );
    compose(base, libraries)
}

/// Filter for one weighted lookup: `library = name`, AND-combined with
/// the base filter when present, the same composition the unweighted
/// path uses.
pub fn for_library(base: Option<&Filter>, name: &str) -> Filter {
    compose(base, Filter::eq(LIBRARY_KEY, name))
}

fn compose(base: Option<&Filter>, library_filter: Filter) -> Filter {
    match base {
        Some(base) => Filter::and(vec![base.clone(), library_filter]),
        None => library_filter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn passage(library: &str, doc_type: &str) -> Passage {
        Passage::new("text", library, 0).with_metadata("type", json!(doc_type))
    }

    #[test]
    fn test_library_set_without_base() {
        let names = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let filter = for_library_set(None, &names);

        assert_eq!(
            filter,
            Filter::is_in(LIBRARY_KEY, vec![json!("A"), json!("B"), json!("C")])
        );
    }

    #[test]
    fn test_library_set_with_base() {
        let base = Filter::eq("type", "article");
        let names = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let filter = for_library_set(Some(&base), &names);

        assert_eq!(
            filter,
            Filter::and(vec![
                Filter::eq("type", "article"),
                Filter::is_in(LIBRARY_KEY, vec![json!("A"), json!("B"), json!("C")]),
            ])
        );
    }

    #[test]
    fn test_single_library_with_base_composes_like_set_case() {
        let base = Filter::eq("type", "article");
        let filter = for_library(Some(&base), "guides");

        assert_eq!(
            filter,
            Filter::and(vec![
                Filter::eq("type", "article"),
                Filter::eq(LIBRARY_KEY, "guides"),
            ])
        );
    }

    #[test]
    fn test_eq_matches() {
        let filter = Filter::eq(LIBRARY_KEY, "guides");
        assert!(filter.matches(&passage("guides", "article")));
        assert!(!filter.matches(&passage("faq", "article")));
    }

    #[test]
    fn test_in_matches() {
        let filter = Filter::is_in(LIBRARY_KEY, vec![json!("guides"), json!("faq")]);
        assert!(filter.matches(&passage("faq", "article")));
        assert!(!filter.matches(&passage("blog", "article")));
    }

    #[test]
    fn test_and_matches_all_branches() {
        let filter = Filter::and(vec![
            Filter::eq("type", "article"),
            Filter::eq(LIBRARY_KEY, "guides"),
        ]);
        assert!(filter.matches(&passage("guides", "article")));
        assert!(!filter.matches(&passage("guides", "video")));
        assert!(!filter.matches(&passage("faq", "article")));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let filter = Filter::eq("nonexistent", "x");
        assert!(!filter.matches(&passage("guides", "article")));
    }
}
