//! Bounded fixed-delay retry.
//!
//! The host wait and the post-initiation poll share this loop: at most
//! `max_attempts` calls to the action, with a fixed pause between failed
//! attempts and none after the last one.  There is no wall-clock deadline;
//! a slow action stretches the total run past `max_attempts * delay_ms`.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

/// How many times to try and how long to pause between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, garde::Validate)]
pub struct AttemptBudget {
    /// Maximum number of attempts (at least one).
    #[garde(range(min = 1))]
    pub max_attempts: u32,

    /// Pause between failed attempts, in milliseconds.
    #[garde(skip)]
    pub delay_ms: u64,
}

impl AttemptBudget {
    pub const fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }

    /// Budget for waiting on member hosts: 30 attempts, 2 s apart.
    pub const fn host_wait() -> Self {
        Self::new(30, 2000)
    }

    /// Budget for polling status after initiation: 60 attempts, 2 s apart.
    pub const fn primary_poll() -> Self {
        Self::new(60, 2000)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Result of a single attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    /// Stop retrying with this value.
    Done(T),
    /// Not there yet; try again after the delay.
    Retry,
}

/// The budget ran out without a [`Attempt::Done`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exhausted {
    pub attempts: u32,
}

/// Call `action` with the 1-based attempt number until it returns
/// [`Attempt::Done`] or the budget is spent.
pub async fn retry<T, F, Fut>(budget: AttemptBudget, mut action: F) -> Result<T, Exhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    for attempt in 1..=budget.max_attempts {
        if let Attempt::Done(value) = action(attempt).await {
            return Ok(value);
        }
        if attempt < budget.max_attempts && budget.delay_ms > 0 {
            tokio::time::sleep(budget.delay()).await;
        }
    }
    Err(Exhausted {
        attempts: budget.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Instant;

    #[tokio::test]
    async fn test_retry_returns_first_done() {
        let calls = Cell::new(0u32);
        let result = retry(AttemptBudget::new(10, 0), |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt == 4 {
                    Attempt::Done(attempt * 10)
                } else {
                    Attempt::Retry
                }
            }
        })
        .await;
        assert_eq!(result, Ok(40));
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn test_retry_exhausts_after_exactly_max_attempts() {
        let calls = Cell::new(0u32);
        let result: Result<(), _> = retry(AttemptBudget::new(7, 0), |_| {
            calls.set(calls.get() + 1);
            async { Attempt::Retry }
        })
        .await;
        assert_eq!(result, Err(Exhausted { attempts: 7 }));
        assert_eq!(calls.get(), 7);
    }

    #[tokio::test]
    async fn test_retry_passes_attempt_numbers_in_order() {
        let mut seen = Vec::new();
        let _: Result<(), _> = retry(AttemptBudget::new(3, 0), |attempt| {
            seen.push(attempt);
            async { Attempt::Retry }
        })
        .await;
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_retry_no_sleep_after_success_on_first_attempt() {
        let start = Instant::now();
        let result = retry(AttemptBudget::new(5, 5_000), |_| async { Attempt::Done(()) }).await;
        assert!(result.is_ok());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_retry_sleeps_between_attempts_only() {
        // 3 attempts -> 2 pauses of 20 ms, none after the last.
        let start = Instant::now();
        let result: Result<(), _> =
            retry(AttemptBudget::new(3, 20), |_| async { Attempt::Retry }).await;
        let elapsed = start.elapsed();
        assert!(result.is_err());
        assert!(elapsed >= Duration::from_millis(40));
    }

    #[test]
    fn test_default_budgets() {
        assert_eq!(AttemptBudget::host_wait(), AttemptBudget::new(30, 2000));
        assert_eq!(AttemptBudget::primary_poll(), AttemptBudget::new(60, 2000));
        assert_eq!(AttemptBudget::host_wait().delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        use garde::Validate;
        assert!(AttemptBudget::new(0, 10).validate().is_err());
        assert!(AttemptBudget::new(1, 0).validate().is_ok());
    }
}
