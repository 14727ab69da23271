use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Never less than 1.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// What a single attempt decided.
#[derive(Debug, PartialEq, Eq)]
pub enum Attempt<T> {
    /// Stop and return this value.
    Done(T),
    /// Not settled yet; try again if the policy allows.
    Retry,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Completed { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Runs `op` until it returns [`Attempt::Done`] or the policy runs out.
///
/// `op` receives the 1-based attempt number. No delay precedes the first
/// attempt or follows the last one.
pub async fn retry_with_policy<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            debug!(attempt, delay = ?policy.delay, "waiting before retry");
            sleep(policy.delay).await;
        }

        if let Attempt::Done(value) = op(attempt).await {
            return RetryOutcome::Completed {
                value,
                attempts: attempt,
            };
        }
    }

    RetryOutcome::Exhausted {
        attempts: max_attempts,
    }
}
