//! Scatter-gather execution of a retrieval plan.
//!
//! Weighted plans issue one search per library concurrently and join on
//! all of them. Each lookup writes only its own pre-allocated slot, so
//! results stay in plan order no matter which lookup finishes first.
//! Individual lookup failures are absorbed; only a total failure is an
//! error.

use crate::plan::RetrievalPlan;
use crate::store::VectorStore;
use crate::types::Passage;
use librarian_core::{AppError, AppResult};
use std::sync::Arc;

/// Execute every planned lookup against the store.
///
/// Returns one passage list per lookup, in plan order. A failed lookup
/// contributes an empty list; if *all* lookups fail the whole call fails
/// with `AppError::Retrieval` so a caller never mistakes a dead index
/// for an empty corpus.
pub async fn execute_plan(
    store: Arc<dyn VectorStore>,
    query: &[f32],
    plan: &RetrievalPlan,
) -> AppResult<Vec<Vec<Passage>>> {
    if plan.lookups.is_empty() {
        return Err(AppError::Retrieval(
            "Retrieval plan contains no lookups".to_string(),
        ));
    }

    // Single lookup: no fan-out, but the same failure policy.
    if plan.lookups.len() == 1 {
        let lookup = &plan.lookups[0];
        let passages = store
            .search(query, lookup.quota, Some(&lookup.filter))
            .await
            .map_err(|e| AppError::Retrieval(format!("Lookup failed: {}", e)))?;
        return Ok(vec![passages]);
    }

    let mut handles = Vec::with_capacity(plan.lookups.len());
    for (index, lookup) in plan.lookups.iter().enumerate() {
        let store = store.clone();
        let query = query.to_vec();
        let filter = lookup.filter.clone();
        let quota = lookup.quota;
        let library = lookup.library.clone();

        handles.push(tokio::spawn(async move {
            let result = store.search(&query, quota, Some(&filter)).await;
            (index, library, result)
        }));
    }

    // Slots pre-allocated by lookup index: one writer per slot.
    let mut slots: Vec<Vec<Passage>> = vec![Vec::new(); plan.lookups.len()];
    let mut failures = 0usize;

    for handle in handles {
        match handle.await {
            Ok((index, _, Ok(passages))) => {
                slots[index] = passages;
            }
            Ok((index, library, Err(e))) => {
                failures += 1;
                tracing::warn!(
                    library = library.as_deref().unwrap_or("<all>"),
                    "Lookup {} failed, continuing without it: {}",
                    index,
                    e
                );
            }
            Err(e) => {
                failures += 1;
                tracing::warn!("Lookup task aborted: {}", e);
            }
        }
    }

    if failures == plan.lookups.len() {
        return Err(AppError::Retrieval(format!(
            "All {} lookups failed",
            failures
        )));
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::plan::Lookup;
    use crate::store::VectorStore;
    use crate::types::LIBRARY_KEY;

    /// Store that fails for the named libraries and serves canned
    /// passages for the rest.
    struct FlakyStore {
        failing: Vec<String>,
    }

    fn filter_library(filter: &Filter) -> Option<String> {
        match filter {
            Filter::Eq { field, value } if field == LIBRARY_KEY => {
                value.as_str().map(|s| s.to_string())
            }
            Filter::And(parts) => parts.iter().find_map(filter_library),
            _ => None,
        }
    }

    #[async_trait::async_trait]
    impl VectorStore for FlakyStore {
        async fn search(
            &self,
            _query: &[f32],
            k: usize,
            filter: Option<&Filter>,
        ) -> AppResult<Vec<Passage>> {
            let library = filter
                .and_then(filter_library)
                .unwrap_or_else(|| "unknown".to_string());

            if self.failing.contains(&library) {
                return Err(AppError::Retrieval(format!(
                    "index unavailable for {}",
                    library
                )));
            }

            Ok((0..k as u64)
                .map(|i| Passage::new(format!("{} passage {}", library, i), library.clone(), i))
                .collect())
        }
    }

    fn plan_for(libraries: &[(&str, usize)]) -> RetrievalPlan {
        RetrievalPlan {
            lookups: libraries
                .iter()
                .map(|(name, quota)| Lookup {
                    library: Some(name.to_string()),
                    filter: Filter::eq(LIBRARY_KEY, *name),
                    quota: *quota,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_all_lookups_succeed() {
        let store = Arc::new(FlakyStore { failing: vec![] });
        let plan = plan_for(&[("guides", 2), ("faq", 1)]);

        let slots = execute_plan(store, &[1.0], &plan).await.unwrap();

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].len(), 2);
        assert_eq!(slots[1].len(), 1);
        assert_eq!(slots[0][0].library(), Some("guides"));
        assert_eq!(slots[1][0].library(), Some("faq"));
    }

    #[tokio::test]
    async fn test_partial_failure_is_absorbed() {
        let store = Arc::new(FlakyStore {
            failing: vec!["faq".to_string()],
        });
        let plan = plan_for(&[("guides", 2), ("faq", 1)]);

        let slots = execute_plan(store, &[1.0], &plan).await.unwrap();

        assert_eq!(slots[0].len(), 2);
        assert!(slots[1].is_empty());
    }

    #[tokio::test]
    async fn test_total_failure_is_an_error() {
        let store = Arc::new(FlakyStore {
            failing: vec!["guides".to_string(), "faq".to_string()],
        });
        let plan = plan_for(&[("guides", 2), ("faq", 1)]);

        let result = execute_plan(store, &[1.0], &plan).await;
        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_single_lookup_failure_is_an_error() {
        let store = Arc::new(FlakyStore {
            failing: vec!["guides".to_string()],
        });
        let plan = plan_for(&[("guides", 2)]);

        let result = execute_plan(store, &[1.0], &plan).await;
        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_results_stay_in_plan_order() {
        let store = Arc::new(FlakyStore { failing: vec![] });
        let plan = plan_for(&[("c", 1), ("a", 1), ("b", 1)]);

        let slots = execute_plan(store, &[1.0], &plan).await.unwrap();

        assert_eq!(slots[0][0].library(), Some("c"));
        assert_eq!(slots[1][0].library(), Some("a"));
        assert_eq!(slots[2][0].library(), Some("b"));
    }
}
