//! Merging lookup results into one bounded context.
//!
//! Lookup slots arrive in plan order (weight-descending for weighted
//! plans). Merging walks them strictly in that order, keeps each
//! lookup's store-assigned order, drops exact duplicates, and stops at
//! the requested total. The strict plan-order walk is the chosen
//! deterministic policy for the case where several oversized lookups
//! compete for the remaining capacity.

use crate::types::Passage;
use std::collections::HashSet;

/// Deduplicate and cap the combined lookup results.
///
/// Two passages are duplicates when content, library and position
/// metadata all match. The result never exceeds `total` entries.
pub fn merge_passages(slots: Vec<Vec<Passage>>, total: usize) -> Vec<Passage> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(total);

    'outer: for slot in slots {
        for passage in slot {
            if merged.len() >= total {
                break 'outer;
            }
            if seen.insert(passage.dedup_key()) {
                merged.push(passage);
            }
        }
    }

    tracing::debug!("Merged context holds {} passages (cap {})", merged.len(), total);
    merged
}
