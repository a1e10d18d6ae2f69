//! Request executor: one outbound call, one deadline, one classified outcome.
//!
//! Every call is bounded by an explicit per-call deadline; when it fires,
//! the in-flight request is aborted and the caller observes a
//! [`CallFailure::Timeout`] instead of blocking. Failures are classified
//! into the closed [`CallFailure`] taxonomy (first matching rule wins):
//!
//! 1. Connection could not be established → `Network`
//! 2. Deadline elapsed → `Timeout`
//! 3. Non-success status → `Upstream` (body captured for diagnostics)
//! 4. Body not parseable as JSON → `Malformed`
//! 5. Anything else → `Unknown`
//!
//! No retries happen here; retry and fallback policy belongs entirely to
//! the orchestrator. Each failure is logged with the target URL, elapsed
//! time, and kind.

use std::time::{Duration, Instant};

use anyhow::Context;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::warn;

use docqa_core::error::CallFailure;

/// Upstream error bodies are captured for diagnostics but capped.
const MAX_CAPTURED_BODY_BYTES: usize = 1024;

/// Owns the HTTP client and the optional bearer token for the backend.
///
/// Explicitly constructed and passed around; there is no process-wide
/// client singleton. Each orchestrator owns its own executor.
pub struct RequestExecutor {
    client: Client,
    bearer: Option<String>,
}

impl RequestExecutor {
    pub fn new(bearer: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("docqa/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, bearer })
    }

    /// `GET` the target and parse the response body as JSON.
    pub async fn get_json(&self, url: &str, deadline: Duration) -> Result<Value, CallFailure> {
        self.run(self.client.get(url), url, deadline).await
    }

    /// `POST` a JSON payload to the target and parse the response as JSON.
    pub async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        deadline: Duration,
    ) -> Result<Value, CallFailure> {
        self.run(self.client.post(url).json(payload), url, deadline)
            .await
    }

    async fn run(
        &self,
        request: RequestBuilder,
        url: &str,
        deadline: Duration,
    ) -> Result<Value, CallFailure> {
        let mut request = request.timeout(deadline);
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let failure = classify_transport(err, deadline);
                record_failure(url, started, &failure);
                return Err(failure);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let failure = CallFailure::Upstream {
                status: status.as_u16(),
                body: truncate(&body, MAX_CAPTURED_BODY_BYTES),
            };
            record_failure(url, started, &failure);
            return Err(failure);
        }

        match response.json::<Value>().await {
            Ok(value) => Ok(value),
            Err(err) => {
                // The body read itself can outlast the deadline.
                let failure = if err.is_timeout() {
                    CallFailure::Timeout(deadline)
                } else {
                    CallFailure::Malformed(err.to_string())
                };
                record_failure(url, started, &failure);
                Err(failure)
            }
        }
    }
}

fn classify_transport(err: reqwest::Error, deadline: Duration) -> CallFailure {
    if err.is_timeout() {
        CallFailure::Timeout(deadline)
    } else if err.is_connect() {
        CallFailure::Network(err.to_string())
    } else {
        CallFailure::Unknown(err.to_string())
    }
}

fn record_failure(url: &str, started: Instant, failure: &CallFailure) {
    warn!(
        url,
        elapsed_ms = started.elapsed().as_millis() as u64,
        kind = failure.kind(),
        "outbound call failed: {failure}"
    );
}

/// Truncate to at most `max` bytes, snapping back to a char boundary.
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_untouched() {
        assert_eq!(truncate("hello", 1024), "hello");
    }

    #[test]
    fn test_truncate_caps_long_string() {
        let long = "x".repeat(2000);
        let capped = truncate(&long, 1024);
        assert_eq!(capped.len(), 1024 + 3);
        assert!(capped.ends_with("..."));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "ééééé"; // 2 bytes per char
        let capped = truncate(s, 3);
        assert!(capped.starts_with('é'));
        assert_eq!(capped, "é...");
    }
}
