use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the inference backend, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    /// Priority-ordered model fallback chain; attempted first to last.
    pub models: Vec<String>,
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Capability flag the health probe must report before any model is tried.
    #[serde(default = "default_required_capability")]
    pub required_capability: String,
    /// Name of the environment variable holding the backend API key, if any.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_health_timeout_secs() -> u64 {
    8
}
fn default_request_timeout_secs() -> u64 {
    45
}
fn default_required_capability() -> String {
    "inference".to_string()
}
fn default_api_key_env() -> String {
    "DOCQA_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

fn default_max_chunk_size() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// How many ranked chunks become grounding context per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Grounding context is truncated to this many characters.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// When no chunks are selected, this many characters of the raw
    /// document are used as context instead.
    #[serde(default = "default_document_fallback_chars")]
    pub document_fallback_chars: usize,
    #[serde(default = "default_max_question_chars")]
    pub max_question_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
            document_fallback_chars: default_document_fallback_chars(),
            max_question_chars: default_max_question_chars(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_max_context_chars() -> usize {
    2000
}
fn default_document_fallback_chars() -> usize {
    1500
}
fn default_max_question_chars() -> usize {
    500
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate backend
    if config.backend.base_url.trim().is_empty() {
        anyhow::bail!("backend.base_url must not be empty");
    }
    if config.backend.models.is_empty() {
        anyhow::bail!("backend.models must list at least one model");
    }
    if config.backend.health_timeout_secs == 0 || config.backend.request_timeout_secs == 0 {
        anyhow::bail!("backend timeouts must be > 0");
    }

    // Validate chunking
    if config.chunking.max_chunk_size == 0 {
        anyhow::bail!("chunking.max_chunk_size must be > 0");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.max_question_chars == 0 {
        anyhow::bail!("retrieval.max_question_chars must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let file = write_config(
            r#"
[backend]
base_url = "http://127.0.0.1:8080"
models = ["primary-model"]
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.backend.health_timeout_secs, 8);
        assert_eq!(config.backend.request_timeout_secs, 45);
        assert_eq!(config.backend.required_capability, "inference");
        assert_eq!(config.chunking.max_chunk_size, 500);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.max_context_chars, 2000);
        assert_eq!(config.retrieval.max_question_chars, 500);
    }

    #[test]
    fn test_full_config_parses() {
        let file = write_config(
            r#"
[server]
bind = "0.0.0.0:9000"

[backend]
base_url = "http://inference.internal:8080"
models = ["big-model", "medium-model", "small-model"]
health_timeout_secs = 5
request_timeout_secs = 30
api_key_env = "MY_KEY"

[chunking]
max_chunk_size = 800

[retrieval]
top_k = 5
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.backend.models.len(), 3);
        assert_eq!(config.backend.api_key_env, "MY_KEY");
        assert_eq!(config.chunking.max_chunk_size, 800);
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn test_empty_model_chain_rejected() {
        let file = write_config(
            r#"
[backend]
base_url = "http://127.0.0.1:8080"
models = []
"#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("at least one model"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let file = write_config(
            r#"
[backend]
base_url = "http://127.0.0.1:8080"
models = ["m"]
health_timeout_secs = 0
"#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let file = write_config(
            r#"
[backend]
base_url = "http://127.0.0.1:8080"
models = ["m"]

[chunking]
max_chunk_size = 0
"#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(load_config(Path::new("/nonexistent/docqa.toml")).is_err());
    }

    #[test]
    fn test_shipped_example_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../config/docqa.example.toml");
        let config = load_config(&path).unwrap();
        assert_eq!(config.backend.models.len(), 3);
        assert_eq!(config.backend.required_capability, "inference");
    }
}
