//! Exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;

use crate::error::HubError;

/// How often and how patiently a retryable provider error is retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first; `1` disables retries.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempts run out. A rate limit's own retry hint wins over the
    /// computed backoff.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, HubError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HubError>>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if !err.is_retryable() || attempt >= self.max_attempts {
                return Err(err);
            }

            let wait = match &err {
                HubError::RateLimited {
                    retry_after_ms: Some(ms),
                } => Duration::from_millis(*ms).min(self.max_backoff),
                _ => backoff.mul_f64(0.75 + jitter() * 0.5),
            };
            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "retrying provider call"
            );
            tokio::time::sleep(wait).await;

            backoff = backoff.mul_f64(self.multiplier).min(self.max_backoff);
            attempt += 1;
        }
    }
}

/// Cheap value in `[0, 1)` from the clock; enough to spread retries.
fn jitter() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 10_000) / 10_000.0
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn retries_retryable_errors_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::default();
        let value = policy
            .execute(move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(HubError::api(503, "busy"))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_on_non_retryable_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = RetryPolicy::default()
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(HubError::api(400, "bad request"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Api { status: 400, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        let err = policy
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(HubError::RateLimited {
                    retry_after_ms: Some(10),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::RateLimited { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
