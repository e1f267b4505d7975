//! Exponential backoff with random jitter for transport setup calls.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::RecoveryConfig;

/// Delay before retry number `attempt` (0-based).
///
/// The exponential delay is capped at `max_retry_delay_ms`; the result lies
/// between half of that and the full value.
pub fn retry_delay(config: &RecoveryConfig, attempt: u32) -> Duration {
    let exponential = config
        .base_retry_delay_ms
        .saturating_mul(1u64 << attempt.min(20));
    let capped = exponential.min(config.max_retry_delay_ms);
    let half = capped / 2;
    let jitter = rand::thread_rng().gen_range(0..=capped - half);
    Duration::from_millis(half + jitter)
}

/// Run `operation` until it succeeds or the retry budget is spent
pub async fn with_retry<T, E, F, Fut>(config: &RecoveryConfig, operation: &str, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < config.max_retries => {
                let delay = retry_delay(config, attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
