//! HTTP API for document upload and grounded chat.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service banner with endpoint listing |
//! | `GET`  | `/health` | Probes the inference backend |
//! | `GET`  | `/models` | Configured model fallback chain |
//! | `POST` | `/documents` | Upload a document; replaces the active one |
//! | `POST` | `/chat` | Ask a question grounded in the active document |
//!
//! # Error Contract
//!
//! All error responses share one envelope:
//!
//! ```json
//! { "error": { "code": "validation", "message": "question cannot be empty" } }
//! ```
//!
//! Codes follow the pipeline's error taxonomy: `validation` (400),
//! `exhausted` (408/429/500 depending on the last failure),
//! `backend_unavailable` and `backend_misconfigured` (503). Exhaustion
//! additionally carries the ordered `attempts` list so callers can render
//! attempt-by-attempt diagnostics.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser frontends
//! can call the API directly.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use docqa_core::error::QaError;
use docqa_core::models::{Answer, Chunk, Document};
use docqa_core::rank;

use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::session::DocumentSession;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    session: Arc<DocumentSession>,
    orchestrator: Arc<Orchestrator>,
}

/// Start the HTTP API on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let orchestrator = Orchestrator::new(config.backend.clone(), config.retrieval.clone())?;
    let state = AppState {
        config: Arc::new(config.clone()),
        session: Arc::new(DocumentSession::new()),
        orchestrator: Arc::new(orchestrator),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/models", get(handle_models))
        .route("/documents", post(handle_upload))
        .route("/chat", post(handle_chat))
        .layer(cors)
        .with_state(state);

    info!("docqa API listening on http://{bind_addr}");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error envelope.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code, stable across releases.
    code: String,
    message: String,
    /// Human remediation text, when we have something actionable.
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    /// Ordered attempt history, present when the fallback chain was
    /// exhausted.
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<Vec<AttemptDetail>>,
}

#[derive(Serialize)]
struct AttemptDetail {
    model: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    body: ErrorBody,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        body: ErrorBody {
            error: ErrorDetail {
                code: "validation".to_string(),
                message: message.into(),
                hint: None,
                attempts: None,
            },
        },
    }
}

impl From<QaError> for AppError {
    fn from(err: QaError) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let hint = match &err {
            QaError::BackendUnavailable { hint, .. } => Some(hint.clone()),
            _ => None,
        };
        let attempts = match &err {
            QaError::Exhausted { attempts } => Some(
                attempts
                    .iter()
                    .map(|a| AttemptDetail {
                        model: a.model_id.clone(),
                        kind: a.failure().map(|f| f.kind()).unwrap_or("success"),
                        message: a.failure().map(|f| f.to_string()),
                    })
                    .collect(),
            ),
            _ => None,
        };

        AppError {
            status,
            body: ErrorBody {
                error: ErrorDetail {
                    code: err.kind().to_string(),
                    message: err.to_string(),
                    hint,
                    attempts,
                },
            },
        }
    }
}

// ============ GET / ============

async fn handle_root() -> Json<Value> {
    Json(json!({
        "message": "docqa API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "models": "/models",
            "documents": "/documents",
            "chat": "/chat",
        },
    }))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// `"ok"` when the backend probe succeeds, `"degraded"` otherwise.
    status: String,
    backend_available: bool,
    models: Vec<String>,
}

/// Probes the inference backend so load balancers and frontends can see
/// end-to-end readiness, not just that this process is up.
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend_available = matches!(
        state.orchestrator.probe_health().await,
        Ok(health) if health.available
    );
    let status = if backend_available { "ok" } else { "degraded" };
    Json(HealthResponse {
        status: status.to_string(),
        backend_available,
        models: state.orchestrator.models().to_vec(),
    })
}

// ============ GET /models ============

async fn handle_models(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "models": state.orchestrator.models() }))
}

// ============ POST /documents ============

#[derive(Deserialize)]
struct UploadRequest {
    text: String,
    #[serde(default)]
    max_chunk_size: Option<usize>,
}

#[derive(Serialize)]
struct UploadResponse {
    chunk_count: usize,
    chunks: Vec<String>,
}

async fn handle_upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    let max_chunk_size = req
        .max_chunk_size
        .unwrap_or(state.config.chunking.max_chunk_size);
    if max_chunk_size == 0 {
        return Err(bad_request("max_chunk_size must be > 0"));
    }

    let document =
        Document::new(req.text, max_chunk_size).map_err(|err| bad_request(err.to_string()))?;
    let document = state.session.replace(document);

    info!(chunks = document.chunks().len(), "document uploaded");

    Ok(Json(UploadResponse {
        chunk_count: document.chunks().len(),
        chunks: document.chunks().iter().map(|c| c.text.clone()).collect(),
    }))
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    question: String,
    /// Inline document text; falls back to the session document.
    #[serde(default)]
    document_text: Option<String>,
    /// Pre-segmented chunks; fall back to the session document's chunks.
    #[serde(default)]
    chunks: Option<Vec<String>>,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Answer>, AppError> {
    let question = req.question.trim().to_string();
    validate_question(&question, state.config.retrieval.max_question_chars)?;

    let session_doc = state.session.current();

    let chunks: Vec<Chunk> = match &req.chunks {
        Some(texts) if !texts.is_empty() => texts
            .iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                index,
                text: text.clone(),
            })
            .collect(),
        _ => session_doc
            .as_ref()
            .map(|doc| doc.chunks().to_vec())
            .unwrap_or_default(),
    };

    let document_text = req
        .document_text
        .or_else(|| session_doc.as_ref().map(|doc| doc.raw_text().to_string()))
        .unwrap_or_default();

    if chunks.is_empty() && document_text.trim().is_empty() {
        return Err(bad_request(
            "no document available: upload one or provide document_text or chunks",
        ));
    }

    let ranked = rank::rank(&question, &chunks, state.config.retrieval.top_k);
    let answer = state
        .orchestrator
        .answer(&question, &ranked, &document_text)
        .await?;

    Ok(Json(answer))
}

fn validate_question(question: &str, max_chars: usize) -> Result<(), AppError> {
    if question.is_empty() {
        return Err(bad_request("question cannot be empty"));
    }
    if question.chars().count() > max_chars {
        return Err(bad_request(format!(
            "question exceeds {max_chars} characters"
        )));
    }
    Ok(())
}
