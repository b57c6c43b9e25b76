//! Wall-clock budget guard.
//!
//! Batch maintenance callers run on platforms with hard execution
//! limits; racing the real operation against a timer set below that
//! limit turns an overrun into a typed, retryable error instead of a
//! force-killed process.

use librarian_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;

/// Run a future under a wall-clock budget.
///
/// Elapsed budget yields `AppError::Timeout` naming the operation; the
/// future's own result passes through otherwise.
pub async fn with_deadline<T, F>(operation: &str, budget: Duration, future: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(budget, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation,
                budget_ms = budget.as_millis() as u64,
                "Operation exceeded its wall-clock budget"
            );
            Err(AppError::Timeout {
                operation: operation.to_string(),
                budget_ms: budget.as_millis() as u64,
            })
        }
    }
}
