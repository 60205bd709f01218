use std::future::Future;
use std::time::Duration;

use sentinel_core::error::Result;

/// Run `op` up to `1 + retries` times with a fixed cooldown between
/// attempts. Returns the first success, or the last error once the
/// attempt ceiling is exhausted. The cooldown is a flat delay, not a
/// backoff schedule.
pub async fn with_fixed_delay<T, F, Fut>(retries: u32, delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;

    for attempt in 0..=retries {
        if attempt > 0 {
            tokio::time::sleep(delay).await;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => last_err = Some(e),
        }
    }

    // retries + 1 attempts always run at least once, so last_err is set.
    Err(last_err.unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::error::SentinelError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let calls = AtomicU32::new(0);

        let result = with_fixed_delay(5, Duration::ZERO, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 4 {
                    Err(SentinelError::Embedding("flaky".to_string()))
                } else {
                    Ok(vec![0.1f32, 0.2])
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), vec![0.1, 0.2]);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_exhausts_attempt_ceiling() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_fixed_delay(5, Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SentinelError::Embedding("down".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(SentinelError::Embedding(_))));
        // 1 initial attempt + 5 retries
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_first_attempt_success_runs_once() {
        let calls = AtomicU32::new(0);

        let result = with_fixed_delay(5, Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
