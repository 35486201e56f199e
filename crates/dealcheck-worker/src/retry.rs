// Retry with exponential backoff
//
// The worker itself never retries anything it's asked to do - the host owns
// that. This is what hosts (and the HTTP network) use when they want to.
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000, // Start with 1 second
            max_delay_ms: 30000,    // Max 30 seconds
            backoff_multiplier: 2.0,
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

    /// Delay before retry number `attempt` (1-based), capped at `max_delay_ms`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let ms = (self.initial_delay_ms as f64 * factor) as u64;
        Duration::from_millis(ms.min(self.max_delay_ms))
    }
}

/// Run `operation` until it succeeds or the policy runs out of retries
///
/// The last error is returned as-is when we give up.
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("Succeeded after {} retries", attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                attempt += 1;

                if attempt > policy.max_retries {
                    if policy.max_retries > 0 {
                        warn!("Giving up after {} attempts: {}", attempt, err);
                    }
                    return Err(err);
                }

                let delay = policy.delay_for(attempt);
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {}ms...",
                    attempt,
                    policy.max_retries,
                    err,
                    delay.as_millis()
                );

                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay_ms: 5,
            max_delay_ms: 20,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_immediately() {
        let call_count = AtomicU32::new(0);

        let result = with_retry(&fast_policy(3), || async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Ok::<_, &str>(42)
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let call_count = AtomicU32::new(0);

        let result = with_retry(&fast_policy(3), || async {
            let count = call_count.fetch_add(1, Ordering::SeqCst) + 1;
            if count < 3 {
                Err("sync backend unreachable")
            } else {
                Ok("synced")
            }
        })
        .await;

        assert_eq!(result, Ok("synced"));
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_policy_tries_once() {
        let call_count = AtomicU32::new(0);

        let result = with_retry(&RetryPolicy::none(), || async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("offline")
        })
        .await;

        assert_eq!(result, Err("offline"));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = fast_policy(5);
        assert_eq!(policy.delay_for(1), Duration::from_millis(5));
        assert_eq!(policy.delay_for(2), Duration::from_millis(10));
        assert_eq!(policy.delay_for(3), Duration::from_millis(20));
        assert_eq!(policy.delay_for(4), Duration::from_millis(20));
    }
}
