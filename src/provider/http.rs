//! Shared HTTP client, auth headers, status mapping and pacing.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::HubError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if !api_key.is_empty() {
        if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
            headers.insert(AUTHORIZATION, val);
        }
    }
    headers
}

/// Map a non-success status and body to an error.
pub fn status_to_error(status: u16, body: &str) -> HubError {
    match status {
        429 => HubError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => HubError::api(status, error_message(body)),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

/// Spaces requests at least `1 / per_second` apart.
#[derive(Debug)]
pub struct RequestPacer {
    interval: Duration,
    next: Mutex<Instant>,
}

impl RequestPacer {
    pub fn per_second(limit: u32) -> Self {
        let interval = if limit == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / limit
        };
        Self {
            interval,
            next: Mutex::new(Instant::now()),
        }
    }

    /// Wait for the next free slot.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        let wake = {
            let mut next = self.next.lock().await;
            let now = Instant::now();
            let slot = (*next).max(now);
            *next = slot + self.interval;
            slot
        };
        tokio::time::sleep_until(wake).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_status_carries_retry_hint() {
        let err = status_to_error(429, r#"{"error":{"message":"slow down","retry_after":1.5}}"#);
        assert!(matches!(err, HubError::RateLimited { retry_after_ms: Some(1500) }));
    }

    #[test]
    fn api_error_prefers_the_body_message() {
        let err = status_to_error(400, r#"{"error":{"message":"bad model"}}"#);
        assert_eq!(err.to_string(), "API error (status 400): bad model");
        let err = status_to_error(502, "gateway");
        assert_eq!(err.to_string(), "API error (status 502): gateway");
    }

    #[tokio::test(start_paused = true)]
    async fn pacer_spaces_requests() {
        let pacer = RequestPacer::per_second(10);
        let start = Instant::now();
        pacer.acquire().await;
        pacer.acquire().await;
        pacer.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
