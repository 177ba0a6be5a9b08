//! Bounded retry for idempotent reads.
//!
//! Transient network failures on reads are retried with exponential
//! backoff. Writes are never routed through here: a non-idempotent
//! mutation that failed ambiguously must surface to the caller, not be
//! silently re-sent.

use std::future::Future;
use std::time::Duration;

use crate::error::{SyncError, SyncResult};

/// Retry configuration with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Calculate the delay before the given retry (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let delay = Duration::from_secs_f64(delay_secs);

        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }
}

/// Run an idempotent read with bounded retries.
///
/// Every attempt's error is logged; the final error is wrapped in
/// [`SyncError::RetriesExhausted`] with the attempt count.
pub async fn retry_read<T, F, Fut>(policy: &RetryPolicy, mut read: F) -> SyncResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SyncResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 0..attempts {
        match read().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::debug!(attempt, error = %e, "Read attempt failed");
                last_error = e.to_string();
            }
        }

        if attempt + 1 < attempts {
            tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
        }
    }

    Err(SyncError::RetriesExhausted {
        attempts,
        last_error,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(30), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_later_attempt() {
        tokio::time::pause();

        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let result = retry_read(&policy, || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SyncError::Store("flaky".to_string()))
                } else {
                    Ok(7_u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_reports_attempts() {
        tokio::time::pause();

        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };

        let result: SyncResult<()> = retry_read(&policy, || async {
            Err(SyncError::Store("down".to_string()))
        })
        .await;

        match result {
            Err(SyncError::RetriesExhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("down"));
            }
            _ => panic!("Expected RetriesExhausted"),
        }
    }

    #[tokio::test]
    async fn test_first_success_makes_one_call() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let result = retry_read(&policy, || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1_u32)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
