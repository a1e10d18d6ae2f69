//! Closed error taxonomy for the question-answering pipeline.
//!
//! Three layers, matching who can fail and who decides what happens next:
//!
//! - [`SegmentError`] — the segmenter's only failure mode (bad input).
//! - [`CallFailure`] — classification of a single outbound call, produced
//!   by the request executor. The executor never retries; fallback policy
//!   belongs to the orchestrator.
//! - [`QaError`] — what the orchestrator surfaces upward: validation,
//!   short-circuits from the health probe, or chain exhaustion with the
//!   full ordered attempt history.
//!
//! Every variant carries a stable machine-readable [`kind`](QaError::kind)
//! and an HTTP-style [`status_code`](QaError::status_code) so boundaries can
//! render either a generic message or attempt-by-attempt diagnostics.

use std::time::Duration;

use thiserror::Error;

use crate::models::BackendAttempt;

/// Failure produced by the text segmenter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    #[error("document text is empty or too short to segment")]
    EmptyInput,
}

/// Classified outcome of one outbound call. First matching rule wins:
/// connection problems before deadlines, deadlines before status codes,
/// status codes before parse failures.
#[derive(Debug, Clone, Error)]
pub enum CallFailure {
    /// Connection could not be established (DNS, refused, reset).
    #[error("connection failed: {0}")]
    Network(String),
    /// The per-call deadline elapsed; the in-flight call was cancelled.
    #[error("deadline of {0:?} elapsed before a response arrived")]
    Timeout(Duration),
    /// The remote responded with a non-success status.
    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    /// A response arrived but its body was not the expected shape.
    #[error("response body could not be parsed: {0}")]
    Malformed(String),
    /// Anything the rules above did not match.
    #[error("request failed: {0}")]
    Unknown(String),
}

impl CallFailure {
    /// Stable machine-readable kind for logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CallFailure::Network(_) => "network",
            CallFailure::Timeout(_) => "timeout",
            CallFailure::Upstream { .. } => "upstream",
            CallFailure::Malformed(_) => "malformed_response",
            CallFailure::Unknown(_) => "unknown",
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, CallFailure::Upstream { status: 429, .. })
    }
}

/// Error surfaced by the backend orchestrator for one question.
#[derive(Debug, Error)]
pub enum QaError {
    /// Bad or missing input; surfaced immediately, never retried.
    #[error("{0}")]
    Validation(String),
    /// The health probe failed: the model chain was never attempted.
    #[error("inference backend unavailable: {failure}")]
    BackendUnavailable {
        failure: CallFailure,
        /// Human remediation text ("check that the backend is running…").
        hint: String,
    },
    /// The backend is up but reports itself unusable (capability missing).
    #[error("inference backend misconfigured: {message}")]
    BackendMisconfigured { message: String },
    /// Every model in the fallback chain failed.
    #[error("every model in the fallback chain failed ({} attempts)", .attempts.len())]
    Exhausted { attempts: Vec<BackendAttempt> },
}

impl QaError {
    /// Stable machine-readable kind for error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            QaError::Validation(_) => "validation",
            QaError::BackendUnavailable { .. } => "backend_unavailable",
            QaError::BackendMisconfigured { .. } => "backend_misconfigured",
            QaError::Exhausted { .. } => "exhausted",
        }
    }

    /// The failure behind the most recent attempt, when the chain was
    /// exhausted.
    pub fn last_failure(&self) -> Option<&CallFailure> {
        match self {
            QaError::Exhausted { attempts } => {
                attempts.iter().rev().find_map(BackendAttempt::failure)
            }
            QaError::BackendUnavailable { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// HTTP-style status class: 400 validation, 408 timeout, 429 rate
    /// limit, 500 internal, 503 backend unavailable or misconfigured.
    pub fn status_code(&self) -> u16 {
        match self {
            QaError::Validation(_) => 400,
            QaError::BackendUnavailable { .. } | QaError::BackendMisconfigured { .. } => 503,
            QaError::Exhausted { .. } => match self.last_failure() {
                Some(CallFailure::Timeout(_)) => 408,
                Some(f) if f.is_rate_limit() => 429,
                _ => 500,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttemptOutcome;

    fn failed_attempt(model: &str, failure: CallFailure) -> BackendAttempt {
        BackendAttempt {
            model_id: model.to_string(),
            outcome: AttemptOutcome::Failure(failure),
        }
    }

    #[test]
    fn test_validation_maps_to_400() {
        let err = QaError::Validation("question cannot be empty".into());
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_unavailable_and_misconfigured_map_to_503() {
        let unavailable = QaError::BackendUnavailable {
            failure: CallFailure::Network("connection refused".into()),
            hint: "check that the backend is running".into(),
        };
        assert_eq!(unavailable.status_code(), 503);

        let misconfigured = QaError::BackendMisconfigured {
            message: "capability 'inference' missing".into(),
        };
        assert_eq!(misconfigured.status_code(), 503);
    }

    #[test]
    fn test_exhausted_status_follows_last_failure() {
        let timeout = QaError::Exhausted {
            attempts: vec![
                failed_attempt("a", CallFailure::Upstream { status: 500, body: String::new() }),
                failed_attempt("b", CallFailure::Timeout(Duration::from_secs(45))),
            ],
        };
        assert_eq!(timeout.status_code(), 408);

        let rate_limited = QaError::Exhausted {
            attempts: vec![failed_attempt(
                "a",
                CallFailure::Upstream { status: 429, body: "slow down".into() },
            )],
        };
        assert_eq!(rate_limited.status_code(), 429);

        let generic = QaError::Exhausted {
            attempts: vec![failed_attempt("a", CallFailure::Malformed("not json".into()))],
        };
        assert_eq!(generic.status_code(), 500);
        assert_eq!(generic.kind(), "exhausted");
    }
}
