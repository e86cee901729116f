//! Bounded waits around persistence calls.

use std::future::Future;
use std::time::Duration;

use crate::repository::RepositoryError;

/// Default time budget for one persistence call.
pub const DEFAULT_PERSISTENCE_BUDGET: Duration = Duration::from_secs(5);

/// Runs `call`, giving up after `budget`.
///
/// A timeout is counted, logged and returned as [`RepositoryError::Timeout`];
/// the abandoned call is dropped.
pub async fn bounded<T, F>(
    operation: &'static str,
    budget: Duration,
    call: F,
) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?budget, "persistence call timed out");
            metrics::counter!("persistence_timeouts_total", "operation" => operation).increment(1);
            Err(RepositoryError::Timeout(budget))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let result: Result<(), _> = bounded("slow", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(RepositoryError::Timeout(d)) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let result = bounded("fast", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
