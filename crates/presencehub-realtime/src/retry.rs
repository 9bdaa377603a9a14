//! Bounded retry with exponential backoff for transient I/O.

use std::future::Future;

use tracing::{info, warn};

use presencehub_core::config::RetryConfig;
use presencehub_core::result::AppResult;

/// Runs `op` until it succeeds, fails permanently, or attempts run out.
///
/// Only errors whose kind is transient are retried. After exhaustion the
/// last error is returned and the operation counts as not having happened.
pub async fn with_backoff<T, F, Fut>(operation: &str, retry: &RetryConfig, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = retry.backoff_for(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use presencehub_core::error::{AppError, ErrorKind};

    fn retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let started = tokio::time::Instant::now();

        let result = with_backoff("test", &retry(), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::cache("down"))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // 100ms + 200ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: AppResult<()> = with_backoff("test", &retry(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::service_unavailable("broker down"))
        })
        .await;

        assert_eq!(result.unwrap_err().kind, ErrorKind::ServiceUnavailable);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: AppResult<()> = with_backoff("test", &retry(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::session("gone"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
