//! Retrieval planning: library weights to integer passage quotas.
//!
//! A weighted library list is converted into per-library quotas that sum
//! exactly to the requested total, using the largest-remainder method
//! with declaration-order tie-breaks. An unweighted list produces a
//! single lookup over all libraries with an inclusion-set filter.

use crate::filter::{for_library, for_library_set, Filter};
use librarian_core::{AppError, AppResult, LibrarySpec};

/// One planned vector-store lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    /// The library this lookup targets; `None` for the unweighted
    /// inclusion-set lookup covering all libraries at once.
    pub library: Option<String>,

    /// Composed filter handed unmodified to the store.
    pub filter: Filter,

    /// Number of passages to request.
    pub quota: usize,
}

/// An ordered set of planned lookups.
///
/// Weighted plans are ordered weight-descending (declaration order for
/// ties); the merger relies on this ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalPlan {
    pub lookups: Vec<Lookup>,
}

impl RetrievalPlan {
    /// Total passages the plan will request.
    pub fn total_quota(&self) -> usize {
        self.lookups.iter().map(|l| l.quota).sum()
    }
}

/// Plan the lookups for one retrieval.
///
/// # Errors
/// `AppError::Config` when `total` is zero, the library list is empty,
/// bare and weighted entries are mixed, or any weight is not a positive
/// finite number.
pub fn plan_lookups(
    total: usize,
    base_filter: Option<&Filter>,
    libraries: &[LibrarySpec],
) -> AppResult<RetrievalPlan> {
    if total == 0 {
        return Err(AppError::Config(
            "Requested passage count must be at least 1".to_string(),
        ));
    }

    if libraries.is_empty() {
        return Err(AppError::Config(
            "Cannot plan retrieval over an empty library list".to_string(),
        ));
    }

    let weighted = libraries.iter().filter(|l| l.weight().is_some()).count();
    if weighted != 0 && weighted != libraries.len() {
        return Err(AppError::Config(
            "Library list mixes bare and weighted entries".to_string(),
        ));
    }

    if weighted == 0 {
        let names: Vec<String> = libraries.iter().map(|l| l.name().to_string()).collect();
        return Ok(RetrievalPlan {
            lookups: vec![Lookup {
                library: None,
                filter: for_library_set(base_filter, &names),
                quota: total,
            }],
        });
    }

    let mut weights = Vec::with_capacity(libraries.len());
    for lib in libraries {
        // validated above: every entry is weighted
        let weight = lib.weight().unwrap_or_default();
        if !weight.is_finite() || weight <= 0.0 {
            return Err(AppError::Config(format!(
                "Library '{}' has invalid weight {}",
                lib.name(),
                weight
            )));
        }
        weights.push(weight);
    }

    let quotas = allocate_quotas(total, &weights);

    // Order lookups weight-descending, declaration order on ties.
    let mut order: Vec<usize> = (0..libraries.len()).collect();
    order.sort_by(|&a, &b| {
        weights[b]
            .partial_cmp(&weights[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let lookups = order
        .into_iter()
        .filter(|&i| quotas[i] > 0)
        .map(|i| {
            let name = libraries[i].name();
            Lookup {
                library: Some(name.to_string()),
                filter: for_library(base_filter, name),
                quota: quotas[i],
            }
        })
        .collect();

    Ok(RetrievalPlan { lookups })
}

/// Allocate `total` units across `weights` (declaration order preserved).
///
/// Largest-remainder assignment: floors of the ideal shares, then one
/// extra unit at a time to the largest fractional remainders, ties going
/// to earlier declarations. When `total >= weights.len()`, a repair pass
/// guarantees every library at least one unit by taking from the current
/// maximum (preferring the lighter-weighted, later-declared donor among
/// equals), which keeps quotas monotone in weight.
fn allocate_quotas(total: usize, weights: &[f64]) -> Vec<usize> {
    let weight_sum: f64 = weights.iter().sum();
    let count = weights.len();

    let mut quotas = Vec::with_capacity(count);
    let mut remainders = Vec::with_capacity(count);
    for &weight in weights {
        let share = total as f64 * weight / weight_sum;
        let floor = share.floor();
        quotas.push(floor as usize);
        remainders.push(share - floor);
    }

    let assigned: usize = quotas.iter().sum();
    let mut leftover = total - assigned;

    let mut by_remainder: Vec<usize> = (0..count).collect();
    by_remainder.sort_by(|&a, &b| {
        remainders[b]
            .partial_cmp(&remainders[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for &i in &by_remainder {
        if leftover == 0 {
            break;
        }
        quotas[i] += 1;
        leftover -= 1;
    }

    if total >= count {
        repair_minimums(&mut quotas, weights);
    }

    quotas
}

/// Give every library at least one unit without breaking weight
/// monotonicity or the exact sum.
fn repair_minimums(quotas: &mut [usize], weights: &[f64]) {
    loop {
        // Heaviest library still at zero.
        let recipient = (0..quotas.len())
            .filter(|&i| quotas[i] == 0)
            .max_by(|&a, &b| {
                weights[a]
                    .partial_cmp(&weights[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        let Some(recipient) = recipient else {
            return;
        };

        // Donor: maximum quota; among equals the lighter weight, then the
        // later declaration. Taking from the minimum-weight maximum keeps
        // heavier libraries at or above lighter ones.
        let donor = (0..quotas.len())
            .max_by(|&a, &b| {
                quotas[a].cmp(&quotas[b]).then_with(|| {
                    weights[b]
                        .partial_cmp(&weights[a])
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
            })
            .unwrap_or(recipient);

        if quotas[donor] <= 1 {
            // Nothing left to take; total < count, which the caller rules out.
            return;
        }

        quotas[donor] -= 1;
        quotas[recipient] += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LIBRARY_KEY;
    use serde_json::json;

    fn weighted(name: &str, weight: f64) -> LibrarySpec {
        LibrarySpec::Weighted {
            name: name.to_string(),
            weight,
        }
    }

    fn bare(name: &str) -> LibrarySpec {
        LibrarySpec::Bare(name.to_string())
    }

    #[test]
    fn test_largest_remainder_reference_case() {
        // Ideal shares 2.67/1.33, floors 2/1; the spare unit goes to the
        // larger remainder.
        let plan = plan_lookups(4, None, &[weighted("A", 2.0), weighted("B", 1.0)]).unwrap();

        assert_eq!(plan.lookups.len(), 2);
        assert_eq!(plan.lookups[0].library.as_deref(), Some("A"));
        assert_eq!(plan.lookups[0].quota, 3);
        assert_eq!(plan.lookups[1].library.as_deref(), Some("B"));
        assert_eq!(plan.lookups[1].quota, 1);
    }

    #[test]
    fn test_quotas_sum_exactly() {
        for total in 1..40 {
            let libs = [
                weighted("A", 3.5),
                weighted("B", 1.25),
                weighted("C", 0.75),
                weighted("D", 2.0),
            ];
            let plan = plan_lookups(total, None, &libs).unwrap();
            assert_eq!(plan.total_quota(), total, "total={}", total);
        }
    }

    #[test]
    fn test_monotone_in_weight() {
        for total in 4..30 {
            let libs = [
                weighted("A", 5.0),
                weighted("B", 2.0),
                weighted("C", 2.0),
                weighted("D", 0.5),
            ];
            let plan = plan_lookups(total, None, &libs).unwrap();

            let quota = |name: &str| {
                plan.lookups
                    .iter()
                    .find(|l| l.library.as_deref() == Some(name))
                    .map(|l| l.quota)
                    .unwrap_or(0)
            };

            assert!(quota("A") >= quota("B"), "total={}", total);
            assert!(quota("B") >= quota("D"), "total={}", total);
            assert!(quota("C") >= quota("D"), "total={}", total);
        }
    }

    #[test]
    fn test_every_library_served_when_total_allows() {
        // Floors 2.5/0.25/0.25 would starve B and C without repair.
        let libs = [weighted("A", 10.0), weighted("B", 1.0), weighted("C", 1.0)];
        let plan = plan_lookups(3, None, &libs).unwrap();

        assert_eq!(plan.lookups.len(), 3);
        for lookup in &plan.lookups {
            assert!(lookup.quota >= 1);
        }
        assert_eq!(plan.total_quota(), 3);
        // A keeps the most.
        assert_eq!(plan.lookups[0].library.as_deref(), Some("A"));
        assert_eq!(plan.lookups[0].quota, 1);
    }

    #[test]
    fn test_fewer_passages_than_libraries() {
        // total < count: no minimum guarantee, sum still exact.
        let libs = [weighted("A", 2.0), weighted("B", 1.0), weighted("C", 1.0)];
        let plan = plan_lookups(2, None, &libs).unwrap();
        assert_eq!(plan.total_quota(), 2);
        // Zero-quota lookups are not planned at all.
        assert!(plan.lookups.iter().all(|l| l.quota > 0));
    }

    #[test]
    fn test_deterministic_across_runs() {
        let libs = [
            weighted("A", 1.0),
            weighted("B", 1.0),
            weighted("C", 1.0),
            weighted("D", 1.0),
        ];
        let first = plan_lookups(6, None, &libs).unwrap();
        let second = plan_lookups(6, None, &libs).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_equal_weight_ties_favor_declaration_order() {
        let libs = [weighted("A", 1.0), weighted("B", 1.0), weighted("C", 1.0)];
        let plan = plan_lookups(4, None, &libs).unwrap();

        let quotas: Vec<(Option<&str>, usize)> = plan
            .lookups
            .iter()
            .map(|l| (l.library.as_deref(), l.quota))
            .collect();
        assert_eq!(
            quotas,
            vec![(Some("A"), 2), (Some("B"), 1), (Some("C"), 1)]
        );
    }

    #[test]
    fn test_unweighted_single_lookup() {
        let plan = plan_lookups(5, None, &[bare("A"), bare("B"), bare("C")]).unwrap();

        assert_eq!(plan.lookups.len(), 1);
        let lookup = &plan.lookups[0];
        assert_eq!(lookup.library, None);
        assert_eq!(lookup.quota, 5);
        assert_eq!(
            lookup.filter,
            Filter::is_in(LIBRARY_KEY, vec![json!("A"), json!("B"), json!("C")])
        );
    }

    #[test]
    fn test_unweighted_with_base_filter() {
        let base = Filter::eq("type", "article");
        let plan = plan_lookups(5, Some(&base), &[bare("A"), bare("B"), bare("C")]).unwrap();

        assert_eq!(
            plan.lookups[0].filter,
            Filter::and(vec![
                Filter::eq("type", "article"),
                Filter::is_in(LIBRARY_KEY, vec![json!("A"), json!("B"), json!("C")]),
            ])
        );
    }

    #[test]
    fn test_weighted_lookups_compose_base_filter() {
        let base = Filter::eq("type", "article");
        let plan =
            plan_lookups(4, Some(&base), &[weighted("A", 2.0), weighted("B", 1.0)]).unwrap();

        for lookup in &plan.lookups {
            let name = lookup.library.clone().unwrap();
            assert_eq!(
                lookup.filter,
                Filter::and(vec![
                    Filter::eq("type", "article"),
                    Filter::eq(LIBRARY_KEY, name.as_str()),
                ])
            );
        }
    }

    #[test]
    fn test_empty_library_list_rejected() {
        assert!(matches!(
            plan_lookups(4, None, &[]),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_zero_total_rejected() {
        assert!(matches!(
            plan_lookups(0, None, &[bare("A")]),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_mixed_entries_rejected() {
        assert!(matches!(
            plan_lookups(4, None, &[bare("A"), weighted("B", 1.0)]),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_non_positive_weight_rejected() {
        assert!(matches!(
            plan_lookups(4, None, &[weighted("A", 0.0), weighted("B", 1.0)]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            plan_lookups(4, None, &[weighted("A", -2.0), weighted("B", 1.0)]),
            Err(AppError::Config(_))
        ));
    }
}
