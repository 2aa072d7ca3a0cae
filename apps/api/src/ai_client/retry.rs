//! Retry/Backoff Controller.
//!
//! Re-runs a whole attempt (prompt build, remote call, parse, normalize) on
//! any error. Waits `base * 2^attempt` plus up to 10% jitter between attempts.
//! The wait happens inside the caller's task; nothing retries in the background.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::ai_client::Operation;

const JITTER_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    /// Always in `[base * 2^attempt, base * 2^attempt * 1.1)`.
    pub fn backoff_delay<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let delay = self.base_delay.as_secs_f64() * 2f64.powi(attempt as i32);
        let jitter_cap = delay * JITTER_FRACTION;
        let jitter = if jitter_cap > 0.0 {
            rng.gen_range(0.0..jitter_cap)
        } else {
            0.0
        };
        Duration::from_secs_f64(delay + jitter)
    }
}

/// Runs `attempt_fn` until it succeeds or the retry budget is spent.
/// The closure receives the 0-based attempt number. The last error is returned.
pub async fn with_retries<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: Operation,
    mut attempt_fn: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;

    loop {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries => {
                let delay = policy.backoff_delay(attempt, &mut rand::thread_rng());
                warn!(
                    "{} attempt {}/{} failed: {}. Retrying after {}ms",
                    operation,
                    attempt + 1,
                    policy.max_retries + 1,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(
                    "{} failed after {} attempts: {}",
                    operation,
                    attempt + 1,
                    e
                );
                return Err(e);
            }
        }
    }
}
