//! Backoff executor — generic retry wrapper for external calls.
//!
//! The delay sequence is deterministic (`base, base*2, base*4, ...`, no
//! jitter) and part of the observable contract, so tests can assert it with
//! a paused tokio clock.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

/// Runs `operation` up to `max_retries + 1` times.
///
/// On failure of attempt `i` (for `i < max_retries`) it sleeps
/// `base_delay * 2^i` and tries again. The final attempt's error is returned
/// verbatim — this is the only path that surfaces a provider error to the
/// calling stage.
pub async fn execute_with_backoff<T, E, F, Fut>(
    mut operation: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    for attempt in 0..=max_retries {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt == max_retries => {
                error!("Operation failed after {} attempts: {e}", max_retries + 1);
                return Err(e);
            }
            Err(e) => {
                let delay = base_delay * 2u32.pow(attempt);
                warn!(
                    "Attempt {} failed: {e}. Retrying in {}ms...",
                    attempt + 1,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    unreachable!("loop always returns on the final attempt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Fails the first `failures` calls, then succeeds with the call count.
    fn flaky(
        counter: &AtomicU32,
        failures: u32,
    ) -> impl Future<Output = Result<u32, String>> + '_ {
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= failures {
                Err(format!("boom #{n}"))
            } else {
                Ok(n)
            }
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_no_delay() {
        let calls = AtomicU32::new(0);
        let result =
            execute_with_backoff(|| flaky(&calls, 0), 3, Duration::from_secs(1)).await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success_after_exact_delays() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result =
            execute_with_backoff(|| flaky(&calls, 2), 3, Duration::from_secs(1)).await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after attempt 0, 2s after attempt 1 — 3s total, no jitter.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_original_error() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> =
            execute_with_backoff(|| flaky(&calls, 10), 2, Duration::from_secs(1)).await;

        // 3 attempts total, error from the final one, message preserved.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err(), "boom #3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_doubles_per_attempt() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let _: Result<u32, String> =
            execute_with_backoff(|| flaky(&calls, 10), 3, Duration::from_millis(100)).await;

        // 100 + 200 + 400 ms between the four attempts.
        assert_eq!(start.elapsed(), Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_zero_retries_single_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> =
            execute_with_backoff(|| flaky(&calls, 1), 0, Duration::from_secs(1)).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
