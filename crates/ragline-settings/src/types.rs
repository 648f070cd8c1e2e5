//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON file
//! format. Each type implements [`Default`] with production default values,
//! and `#[serde(default)]` lets partial JSON fill in the rest.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the ragline pipeline.
///
/// # JSON Format
///
/// ```json
/// {
///   "embedding": { "model": "text-embedding-3-small" },
///   "retrieval": { "limit": 8 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaglineSettings {
    /// Embedding provider settings.
    pub embedding: EmbeddingSettings,
    /// Text chunking settings.
    pub chunking: ChunkingSettings,
    /// Similarity retrieval settings.
    pub retrieval: RetrievalSettings,
    /// Vector store settings.
    pub store: StoreSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl RaglineSettings {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.model.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "embedding.model must not be empty".into(),
            ));
        }
        if self.chunking.chunk_size == 0 {
            return Err(SettingsError::InvalidValue(
                "chunking.chunkSize must be greater than zero".into(),
            ));
        }
        if self.retrieval.limit == 0 {
            return Err(SettingsError::InvalidValue(
                "retrieval.limit must be greater than zero".into(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.retrieval.min_similarity) {
            return Err(SettingsError::InvalidValue(format!(
                "retrieval.minSimilarity {} is outside [-1, 1]",
                self.retrieval.min_similarity
            )));
        }
        if self.embedding.dimensions == Some(0) {
            return Err(SettingsError::InvalidValue(
                "embedding.dimensions must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Embedding provider settings (`OpenAI`-compatible API).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Embedding model identifier sent with every request.
    pub model: String,
    /// Base URL of the `/embeddings` endpoint.
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Optional output dimension override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    /// HTTP request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            dimensions: None,
            timeout_ms: 30_000,
        }
    }
}

/// Text chunking settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkingSettings {
    /// Characters per chunk.
    pub chunk_size: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 1000 }
    }
}

/// Similarity retrieval settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalSettings {
    /// Results must score strictly above this cosine similarity.
    pub min_similarity: f64,
    /// Maximum number of results per query.
    pub limit: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            min_similarity: 0.3,
            limit: 4,
        }
    }
}

/// Which vector store backend to open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Embedded `SQLite` file.
    #[default]
    Sqlite,
    /// Postgres with the `pgvector` extension.
    Postgres,
}

/// Vector store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Backend selection.
    pub backend: StoreBackend,
    /// `SQLite` database path (may contain `~`).
    pub sqlite_path: String,
    /// Postgres connection string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Schema holding the embeddings table (Postgres only).
    pub schema: String,
    /// Embeddings table name.
    pub table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            sqlite_path: "~/.ragline/embeddings.db".to_string(),
            database_url: None,
            schema: "public".to_string(),
            table: "embeddings".to_string(),
        }
    }
}

impl StoreSettings {
    /// Resolve the `SQLite` path, expanding `~/` to the home directory.
    pub fn resolved_sqlite_path(&self) -> String {
        if let Some(rest) = self.sqlite_path.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return format!("{home}/{rest}");
            }
        }
        self.sqlite_path.clone()
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
