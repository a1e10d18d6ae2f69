//! Backend orchestrator: health probe, grounding prompt, fallback chain.
//!
//! Runs a small explicit state machine per question:
//!
//! ```text
//! HealthCheck ──▶ Invoking(model 0) ──▶ Answered
//!      │               │
//!      │               ├──▶ Invoking(model 1) ──▶ …
//!      ▼               ▼
//!  Unavailable /   Exhausted (full attempt history)
//!  Misconfigured
//! ```
//!
//! The health probe runs with a short deadline before every question; a
//! probe failure short-circuits the whole chain with zero model attempts.
//! Model invocations are strictly sequential: each fallback decision
//! depends on the previous outcome, and speculative concurrent calls would
//! waste quota against rate-limited upstreams. The health and inference
//! deadlines are independent budgets.

use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use docqa_core::error::{CallFailure, QaError};
use docqa_core::models::{Answer, AttemptOutcome, BackendAttempt, Chunk, HealthStatus};

use crate::config::{BackendConfig, RetrievalConfig};
use crate::executor::RequestExecutor;

pub struct Orchestrator {
    executor: RequestExecutor,
    backend: BackendConfig,
    retrieval: RetrievalConfig,
}

/// Per-question state. `Answered` and the terminal errors are expressed as
/// early returns carrying their payloads.
enum Step {
    HealthCheck,
    Invoking(usize),
}

/// Response shape of one model invocation.
#[derive(Deserialize)]
struct GenerateResponse {
    answer: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    processing_time: Option<f64>,
}

impl Orchestrator {
    /// Build an orchestrator owning its own executor. The backend API key,
    /// if any, is read from the environment variable named in the config.
    pub fn new(backend: BackendConfig, retrieval: RetrievalConfig) -> anyhow::Result<Self> {
        let bearer = std::env::var(&backend.api_key_env)
            .ok()
            .filter(|key| !key.is_empty());
        let executor = RequestExecutor::new(bearer)?;
        Ok(Self {
            executor,
            backend,
            retrieval,
        })
    }

    /// The configured fallback chain, in priority order.
    pub fn models(&self) -> &[String] {
        &self.backend.models
    }

    /// Probe the backend's health endpoint with the short deadline.
    ///
    /// Availability can change between turns, so the result is never
    /// cached across questions.
    pub async fn probe_health(&self) -> Result<HealthStatus, CallFailure> {
        let url = format!("{}/health", self.base_url());
        let deadline = Duration::from_secs(self.backend.health_timeout_secs);
        let body = self.executor.get_json(&url, deadline).await?;
        Ok(HealthStatus::from_json(body))
    }

    /// Answer one question grounded in the ranked `context` chunks.
    ///
    /// When `context` is empty, a prefix of `document_text` is used as the
    /// grounding context instead.
    pub async fn answer(
        &self,
        question: &str,
        context: &[Chunk],
        document_text: &str,
    ) -> Result<Answer, QaError> {
        let grounding = self.grounding_context(context, document_text);
        let mut attempts: Vec<BackendAttempt> = Vec::new();
        let mut step = Step::HealthCheck;

        loop {
            step = match step {
                Step::HealthCheck => {
                    let health =
                        self.probe_health()
                            .await
                            .map_err(|failure| QaError::BackendUnavailable {
                                failure,
                                hint: "check that the inference backend is running and reachable"
                                    .to_string(),
                            })?;
                    if !health.available {
                        return Err(QaError::BackendMisconfigured {
                            message: "backend reports itself unavailable; check its API credentials"
                                .to_string(),
                        });
                    }
                    if !health.has_capability(&self.backend.required_capability) {
                        return Err(QaError::BackendMisconfigured {
                            message: format!(
                                "backend is up but lacks the '{}' capability",
                                self.backend.required_capability
                            ),
                        });
                    }
                    info!(capabilities = health.capabilities.len(), "health probe ok");
                    Step::Invoking(0)
                }
                Step::Invoking(i) => {
                    let model = &self.backend.models[i];
                    match self.invoke_model(model, question, &grounding).await {
                        Ok((answer, reported_model, elapsed)) => {
                            attempts.push(BackendAttempt {
                                model_id: model.clone(),
                                outcome: AttemptOutcome::Success {
                                    processing_time: elapsed,
                                },
                            });
                            info!(
                                model,
                                elapsed_secs = elapsed,
                                attempts = attempts.len(),
                                "model answered"
                            );
                            return Ok(Answer {
                                answer,
                                model_used: reported_model.unwrap_or_else(|| model.clone()),
                                processing_time: elapsed,
                                relevant_chunks: context.len(),
                            });
                        }
                        Err(failure) => {
                            warn!(model, kind = failure.kind(), "model attempt failed: {failure}");
                            attempts.push(BackendAttempt {
                                model_id: model.clone(),
                                outcome: AttemptOutcome::Failure(failure),
                            });
                            if i + 1 < self.backend.models.len() {
                                Step::Invoking(i + 1)
                            } else {
                                return Err(QaError::Exhausted { attempts });
                            }
                        }
                    }
                }
            };
        }
    }

    /// One model invocation under the long inference deadline.
    ///
    /// A response with a blank answer counts as malformed: the chain
    /// advances rather than surfacing an empty answer.
    async fn invoke_model(
        &self,
        model: &str,
        question: &str,
        context: &str,
    ) -> Result<(String, Option<String>, f64), CallFailure> {
        let url = format!("{}/models/{}/generate", self.base_url(), model);
        let payload = json!({ "question": question, "context": context });
        let deadline = Duration::from_secs(self.backend.request_timeout_secs);

        let started = Instant::now();
        let value = self.executor.post_json(&url, &payload, deadline).await?;
        let parsed: GenerateResponse =
            serde_json::from_value(value).map_err(|err| CallFailure::Malformed(err.to_string()))?;

        if parsed.answer.trim().is_empty() {
            return Err(CallFailure::Malformed(
                "backend returned an empty answer".to_string(),
            ));
        }

        let elapsed = parsed
            .processing_time
            .unwrap_or_else(|| started.elapsed().as_secs_f64());
        Ok((parsed.answer, parsed.model, elapsed))
    }

    /// Build the grounding context: ranked chunks joined in rank order, or
    /// a prefix of the raw document when no chunks were selected, capped at
    /// `max_context_chars`.
    fn grounding_context(&self, context: &[Chunk], document_text: &str) -> String {
        let joined = if context.is_empty() {
            document_text
                .chars()
                .take(self.retrieval.document_fallback_chars)
                .collect()
        } else {
            context
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        if joined.chars().count() > self.retrieval.max_context_chars {
            let capped: String = joined
                .chars()
                .take(self.retrieval.max_context_chars)
                .collect();
            format!("{capped}...")
        } else {
            joined
        }
    }

    fn base_url(&self) -> &str {
        self.backend.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_orchestrator(retrieval: RetrievalConfig) -> Orchestrator {
        let backend = BackendConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            models: vec!["m".to_string()],
            health_timeout_secs: 1,
            request_timeout_secs: 1,
            required_capability: "inference".to_string(),
            api_key_env: "DOCQA_TEST_UNSET_KEY".to_string(),
        };
        Orchestrator::new(backend, retrieval).unwrap()
    }

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_grounding_joins_chunks_in_rank_order() {
        let orch = test_orchestrator(RetrievalConfig::default());
        let chunks = vec![chunk(2, "second by rank"), chunk(0, "first by rank")];
        let grounding = orch.grounding_context(&chunks, "ignored");
        assert_eq!(grounding, "second by rank\n\nfirst by rank");
    }

    #[test]
    fn test_grounding_falls_back_to_document_prefix() {
        let retrieval = RetrievalConfig {
            document_fallback_chars: 10,
            ..RetrievalConfig::default()
        };
        let orch = test_orchestrator(retrieval);
        let grounding = orch.grounding_context(&[], "abcdefghijKLMNOP");
        assert_eq!(grounding, "abcdefghij");
    }

    #[test]
    fn test_grounding_truncates_long_context() {
        let retrieval = RetrievalConfig {
            max_context_chars: 8,
            ..RetrievalConfig::default()
        };
        let orch = test_orchestrator(retrieval);
        let chunks = vec![chunk(0, "0123456789")];
        assert_eq!(orch.grounding_context(&chunks, ""), "01234567...");
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let backend = BackendConfig {
            base_url: "http://host:8080/".to_string(),
            models: vec!["m".to_string()],
            health_timeout_secs: 1,
            request_timeout_secs: 1,
            required_capability: "inference".to_string(),
            api_key_env: "DOCQA_TEST_UNSET_KEY".to_string(),
        };
        let orch = Orchestrator::new(backend, RetrievalConfig::default()).unwrap();
        assert_eq!(orch.base_url(), "http://host:8080");
    }
}
