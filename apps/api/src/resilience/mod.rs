//! Resilience Layer — bounded retry with exponential backoff, plus the static
//! fallback memes used once retries are exhausted.
//!
//! `retry_with_backoff` is the only retry loop in the service. The caption
//! step, the image renderer and the request orchestrator all go through it.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

pub mod fallback;

/// How many times to try an operation and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay after the first failure. Doubles after every further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Sleep before retrying after the failure of zero-based `attempt`:
    /// 0.5s, 1s, 2s, ... with the default base delay.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Runs `operation` until it succeeds or `policy.max_attempts` tries have failed,
/// returning the last error in the latter case.
///
/// Sleeps with `tokio::time::sleep`, so backoff only parks the current request.
/// No sleep follows the final failed attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 >= max_attempts => {
                warn!("{label}: all {max_attempts} attempts failed, last error: {e}");
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{label}: attempt {}/{} failed ({e}), retrying after {}ms...",
                    attempt + 1,
                    max_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    #[test]
    fn test_default_delays_double_from_half_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<u32, String> =
            retry_with_backoff(&RetryPolicy::default(), "flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(format!("failure {n}"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 0.5s after the first failure, 1s after the second.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500) && elapsed < Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), String> =
            retry_with_backoff(&RetryPolicy::default(), "always-fails", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {n}")) }
            })
            .await;

        assert_eq!(result, Err("failure 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500) && elapsed < Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_does_not_sleep() {
        let started = Instant::now();
        let result: Result<&str, String> =
            retry_with_backoff(&RetryPolicy::default(), "ok", || async { Ok("done") }).await;
        assert_eq!(result, Ok("done"));
        assert!(started.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_zero_max_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 0,
            base_delay: Duration::ZERO,
        };
        let _: Result<(), &str> = retry_with_backoff(&policy, "zero", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("nope") }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
