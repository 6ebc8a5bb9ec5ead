//! Bounded retry with exponential backoff
//!
//! - Delay doubles per attempt from `base_delay_ms`, capped at 16s
//! - ±25% jitter
//! - Only errors that report `is_retryable()` are retried

use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::errors::Result;

/// Default number of retries after the first attempt
pub const MAX_RETRIES: u32 = 3;

const BASE_DELAY_MS: u64 = 1000;

const MAX_DELAY_MS: u64 = 16000;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    enable_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay_ms: BASE_DELAY_MS,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: true,
        }
    }

    pub fn with_config(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: true,
        }
    }

    /// No waiting between attempts
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
            enable_jitter: false,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `operation` until it succeeds, fails permanently, or retries run out.
    /// The last error is returned unchanged.
    pub async fn run<F, Fut, T>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_retryable() || attempt >= self.max_retries {
                        return Err(e);
                    }

                    attempt += 1;
                    let delay = self.calculate_delay(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {}ms",
                        label,
                        attempt,
                        self.max_retries + 1,
                        e,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponential_delay = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));

        let delay_ms = exponential_delay.min(self.max_delay_ms);

        let final_delay = if self.enable_jitter && delay_ms > 0 {
            let jitter = (delay_ms / 4) as i64;
            let random_jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter as f64;
            ((delay_ms as i64) + random_jitter as i64).max(0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }

    /// Upper bound on total sleeping, ignoring jitter
    pub fn max_total_wait_time(&self) -> Duration {
        let total_ms: u64 = (1..=self.max_retries)
            .map(|attempt| {
                self.base_delay_ms
                    .saturating_mul(2u64.saturating_pow(attempt - 1))
                    .min(self.max_delay_ms)
            })
            .sum();
        Duration::from_millis(total_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::JudgeError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay_ms: 1000,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: false,
        };
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(2000));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(4000));
        assert_eq!(policy.calculate_delay(8), Duration::from_millis(MAX_DELAY_MS));
    }

    #[test]
    fn test_jitter_within_bounds() {
        let policy = RetryPolicy::new();
        for _ in 0..50 {
            let delay = policy.calculate_delay(2).as_millis() as u64;
            assert!((1500..=2500).contains(&delay));
        }
    }

    #[test]
    fn test_max_total_wait() {
        let policy = RetryPolicy::with_config(3, 1000);
        assert_eq!(policy.max_total_wait_time(), Duration::from_millis(7000));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result = policy
            .run("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(JudgeError::Timeout { duration_ms: 5 })
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<()> = tokio_test::block_on(policy.run("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(JudgeError::ConfigError("bad key".to_string()))
        }));

        assert!(matches!(result, Err(JudgeError::ConfigError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(2);

        let result: Result<()> = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(JudgeError::provider("openai", "HTTP 503"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
