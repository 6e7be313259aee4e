//! Retry policy with exponential backoff for collaborator calls.
//!
//! - Max retries: 2 (3 total attempts)
//! - Initial delay: 500ms, doubling per retry
//! - Max delay: 8 seconds
//! - Jitter: down-jitter up to 25% (multiplier in [0.75, 1.0])
//!
//! Retryable HTTP statuses are 408, 409, 429 and 5xx; transport errors are
//! classified by the caller.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries (not counting the initial attempt).
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// 0.25 = up to 25% reduction.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no sleeping.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `backoff_step + 1`.
    pub fn delay(&self, backoff_step: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = 1.0 - rand::random::<f64>() * self.jitter_factor;
        Duration::from_secs_f64(capped * jitter)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retries are used up. The last error is returned.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut op: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut step = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if step < self.max_retries && is_retryable(&err) => {
                    let delay = self.delay(step);
                    tracing::debug!(
                        error = %err,
                        retry_count = step + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retrying collaborator call"
                    );
                    tokio::time::sleep(delay).await;
                    step += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Whether an HTTP status is worth retrying.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 429 | 500..=599)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn delay_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let d = policy.delay(0);
            assert!(d >= Duration::from_millis(375) && d <= Duration::from_millis(500));
            let d = policy.delay(1);
            assert!(d >= Duration::from_millis(750) && d <= Duration::from_millis(1000));
        }
        assert!(policy.delay(10) <= Duration::from_secs(8));
    }

    #[test]
    fn retryable_statuses() {
        for s in [408, 409, 429, 500, 503, 529] {
            assert!(is_retryable_status(s), "{s}");
        }
        for s in [400, 401, 404, 422] {
            assert!(!is_retryable_status(s), "{s}");
        }
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let out: Result<u32, String> = fast()
            .run(
                move || async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err("busy".to_string())
                    } else {
                        Ok(n)
                    }
                },
                |_| true,
            )
            .await;
        assert_eq!(out, Ok(2));
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let out: Result<(), String> = fast()
            .run(
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("down".to_string())
                },
                |_| true,
            )
            .await;
        assert!(out.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_fails_immediately() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let _: Result<(), String> = fast()
            .run(
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("bad request".to_string())
                },
                |_| false,
            )
            .await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
