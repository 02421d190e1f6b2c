//! Bounded retry for flaky browser-driven extraction.
//!
//! Fixed ceiling, fixed inter-attempt delay. Exhaustion surfaces the last
//! error as the terminal failure for that one lookup; the caller moves on
//! to the next product rather than aborting the run.

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, ScribeError};

/// Retry policy: attempt ceiling and inter-attempt delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 8,
            delay: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    /// A policy without delays, for tests and non-browser callers.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Run a fallible async operation under the policy. Non-retryable errors
/// (configuration, missing tab) short-circuit without consuming budget.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err: Option<ScribeError> = None;
    for attempt in 1..=policy.max_attempts {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(what, attempt, "succeeded after retries");
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                tracing::warn!(what, attempt, max = policy.max_attempts, error = %e, "attempt failed");
                last_err = Some(e);
                if attempt < policy.max_attempts && !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        ScribeError::Browser(format!("{what}: retry ceiling was zero attempts"))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn always_failing_runs_exactly_the_ceiling() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(RetryPolicy::immediate(8), "stub", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ScribeError::OverlayNotReady("still gone".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn succeeds_midway_and_stops() {
        let calls = AtomicU32::new(0);
        let result = with_retry(RetryPolicy::immediate(8), "stub", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(ScribeError::ValueNotFound {
                        label: "x".into(),
                        strategies: 3,
                    })
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(RetryPolicy::immediate(8), "stub", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ScribeError::Configuration("missing id".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
