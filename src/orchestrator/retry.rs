//! Exponential backoff for transient publish failures

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::publish::PublishError;
use crate::settings::RetrySettings;

/// Backoff policy applied to transient publish errors
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            multiplier: settings.multiplier,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Next backoff, capped at `max_backoff` even when the product overflows
    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.multiplier)
            .map_or(self.max_backoff, |next| next.min(self.max_backoff))
    }
}

/// Why a retried publish gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// Cancelled before an attempt started or while backing off
    Cancelled,
    /// Permanent failure, or transient failures past the retry budget
    Failed(PublishError),
}

/// Run `publish_fn` until it succeeds, fails permanently, or the budget runs out.
///
/// Cancellation is observed before each attempt and during backoff, never
/// in the middle of an attempt, so a publish that started always finishes.
pub async fn publish_with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    repo_name: &str,
    publish_fn: F,
) -> Result<T, RetryError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, PublishError>>,
{
    let mut delay = policy.initial_backoff;

    for attempt in 0..=policy.max_retries {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        match publish_fn().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                warn!(
                    repo = %repo_name,
                    attempt = attempt + 1,
                    ?delay,
                    error = %e,
                    "Transient publish failure, retrying"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                delay = policy.next_delay(delay);
            }
            Err(e) => return Err(RetryError::Failed(e)),
        }
    }

    // The final attempt always returns from the loop above
    Err(RetryError::Failed(PublishError::permanent(
        repo_name,
        "retry budget exhausted",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tracing_test::traced_test;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_millis(1500),
            multiplier: 2.0,
        };
        let second = policy.next_delay(policy.initial_backoff);
        assert_eq!(second, Duration::from_millis(1000));
        assert_eq!(policy.next_delay(second), Duration::from_millis(1500));
    }

    #[test]
    fn test_huge_multiplier_caps_at_max_backoff() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(30),
            multiplier: 1e300,
        };
        assert_eq!(policy.next_delay(policy.initial_backoff), policy.max_backoff);
        assert_eq!(policy.next_delay(Duration::MAX), policy.max_backoff);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_transient_errors_are_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let cancel = CancellationToken::new();
        let result = publish_with_retry(&fast_policy(3), &cancel, "acme-config", || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(PublishError::transient("acme-config", "503"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(logs_contain("Transient publish failure, retrying"));
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> =
            publish_with_retry(&fast_policy(3), &CancellationToken::new(), "acme-config", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(PublishError::permanent("acme-config", "422")) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Failed(e)) if !e.is_transient()));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_last_error() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> =
            publish_with_retry(&fast_policy(2), &CancellationToken::new(), "acme-config", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(PublishError::transient("acme-config", "429")) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Failed(e)) if e.is_transient()));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = publish_with_retry(&fast_policy(3), &cancel, "acme-config", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

        assert_eq!(result, Err(RetryError::Cancelled));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let policy = RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(60),
            multiplier: 1.0,
        };

        let trigger = cancel.clone();
        let result: Result<(), _> = publish_with_retry(&policy, &cancel, "acme-config", || {
            trigger.cancel();
            async { Err(PublishError::transient("acme-config", "503")) }
        })
        .await;

        assert_eq!(result, Err(RetryError::Cancelled));
    }
}
