//! Retry executor — bounded exponential backoff with jitter around any async unit of work.
//!
//! Only failures the classifier marks transient are retried. Everything else is
//! returned unchanged on the first attempt. Retried generative calls are not
//! deterministic, so callers must accept that a later attempt answers differently.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts = max_retries + 1.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    /// Upper bound of the symmetric random offset added to each delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
            multiplier: 2.0,
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry `retry` (0-based): base × multiplier^retry + jitter, floored at zero.
    pub fn delay_with_jitter(&self, retry: u32, jitter_ms: i64) -> Duration {
        let base = self.base_delay.as_millis() as f64 * self.multiplier.powi(retry as i32);
        let total = (base + jitter_ms as f64).max(0.0);
        Duration::from_millis(total.round() as u64)
    }

    pub fn next_delay(&self, retry: u32) -> Duration {
        let max = self.max_jitter.as_millis() as i64;
        let jitter = if max == 0 {
            0
        } else {
            rand::thread_rng().gen_range(-max..=max)
        };
        self.delay_with_jitter(retry, jitter)
    }
}

/// Runs `work` until it succeeds, fails permanently, or the retry budget is spent.
/// The final error is propagated as-is.
pub async fn retry_with_backoff<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    operation: &str,
    is_transient: C,
    mut work: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: Display,
{
    let mut retry = 0;
    loop {
        match work().await {
            Ok(value) => {
                if retry > 0 {
                    info!("{operation} succeeded after {} attempts", retry + 1);
                }
                return Ok(value);
            }
            Err(e) if is_transient(&e) && retry < policy.max_retries => {
                let delay = policy.next_delay(retry);
                warn!(
                    "{operation} attempt {}/{} failed transiently ({e}), retrying after {}ms",
                    retry + 1,
                    policy.max_attempts(),
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(e) => {
                if is_transient(&e) {
                    warn!(
                        "{operation} exhausted {} attempts: {e}",
                        policy.max_attempts()
                    );
                }
                return Err(e);
            }
        }
    }
}
