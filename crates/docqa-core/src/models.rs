//! Core data models used throughout docqa.
//!
//! These types represent the documents, chunks, and backend outcomes that
//! flow through the segmentation, ranking, and orchestration pipeline.

use serde::Serialize;
use serde_json::Value;

use crate::error::{CallFailure, SegmentError};
use crate::segment;

/// A bounded contiguous slice of a document's text, used as a unit of
/// retrieval context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Ordinal position within the document, assigned in original-text order.
    pub index: usize,
    pub text: String,
}

/// An uploaded document together with its segmented chunks.
///
/// Immutable after construction: a new upload replaces the whole value.
/// Fields are private so callers only ever get read-only views.
#[derive(Debug, Clone)]
pub struct Document {
    raw_text: String,
    chunks: Vec<Chunk>,
}

impl Document {
    /// Segment `raw_text` into chunks bounded by `max_chunk_size` characters.
    pub fn new(raw_text: impl Into<String>, max_chunk_size: usize) -> Result<Self, SegmentError> {
        let raw_text = raw_text.into();
        let chunks = segment::segment(&raw_text, max_chunk_size)?;
        Ok(Self { raw_text, chunks })
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

/// Parsed result of a backend health probe.
///
/// Refreshed on demand before each question; never cached across questions,
/// since the backend's availability can change between turns.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub available: bool,
    pub capabilities: Vec<String>,
    /// The full probe response body, kept for diagnostics.
    pub raw: Value,
}

impl HealthStatus {
    /// Parse a probe response body leniently.
    ///
    /// Accepts either an explicit `available: bool` field or a
    /// `status: "ok" | "healthy"` marker. Anything else is treated as
    /// unavailable.
    pub fn from_json(raw: Value) -> Self {
        let available = raw
            .get("available")
            .and_then(Value::as_bool)
            .unwrap_or_else(|| {
                matches!(
                    raw.get("status").and_then(Value::as_str),
                    Some("ok") | Some("healthy")
                )
            });
        let capabilities = raw
            .get("capabilities")
            .and_then(Value::as_array)
            .map(|caps| {
                caps.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            available,
            capabilities,
            raw,
        }
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c == name)
    }
}

/// A successful answer produced by the backend orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    /// Identifier of the model that produced the answer.
    pub model_used: String,
    /// Wall-clock seconds spent on the winning inference call.
    pub processing_time: f64,
    /// How many ranked chunks were used as grounding context.
    pub relevant_chunks: usize,
}

/// One entry in the orchestrator's per-question attempt log.
#[derive(Debug, Clone)]
pub struct BackendAttempt {
    pub model_id: String,
    pub outcome: AttemptOutcome,
}

/// Outcome of a single model invocation.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Success { processing_time: f64 },
    Failure(CallFailure),
}

impl BackendAttempt {
    /// The failure behind this attempt, if it was one.
    pub fn failure(&self) -> Option<&CallFailure> {
        match &self.outcome {
            AttemptOutcome::Failure(f) => Some(f),
            AttemptOutcome::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_segments_on_construction() {
        let doc = Document::new("First paragraph of the document.\n\nSecond paragraph here.", 500)
            .unwrap();
        assert_eq!(doc.chunks().len(), 1);
        assert_eq!(doc.chunks()[0].index, 0);
        assert!(doc.raw_text().starts_with("First paragraph"));
    }

    #[test]
    fn test_health_from_explicit_available() {
        let status = HealthStatus::from_json(json!({
            "available": true,
            "capabilities": ["inference", "streaming"],
        }));
        assert!(status.available);
        assert!(status.has_capability("inference"));
        assert!(!status.has_capability("embeddings"));
    }

    #[test]
    fn test_health_from_status_marker() {
        let status = HealthStatus::from_json(json!({ "status": "healthy" }));
        assert!(status.available);
        assert!(status.capabilities.is_empty());

        let status = HealthStatus::from_json(json!({ "status": "degraded" }));
        assert!(!status.available);
    }

    #[test]
    fn test_health_available_field_wins_over_status() {
        let status = HealthStatus::from_json(json!({
            "status": "healthy",
            "available": false,
        }));
        assert!(!status.available);
    }

    #[test]
    fn test_health_from_garbage_body() {
        let status = HealthStatus::from_json(json!("not an object"));
        assert!(!status.available);
        assert!(status.capabilities.is_empty());
    }
}
