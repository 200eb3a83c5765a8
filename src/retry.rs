//! Small retry combinator applied to the per-code resolution step.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// How often to re-run an attempt that produced nothing, and how long to
/// wait between runs. The backoff grows linearly: attempt index times the
/// base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay inserted after the given 1-based attempt.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.base_delay * attempt as u32
    }
}

/// Run `op` until it yields a value, up to `policy.max_attempts` times,
/// sleeping `policy.delay_for(attempt)` between runs. Exhaustion yields
/// `None`; nothing is ever raised to the caller.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if let Some(value) = op().await {
            return Some(value);
        }

        if attempt < max_attempts {
            let delay = policy.delay_for(attempt);
            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
    }

    None
}
