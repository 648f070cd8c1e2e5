//! Pipeline configuration.

use ragline_settings::RaglineSettings;
use serde::{Deserialize, Serialize};

use crate::chunker::DEFAULT_CHUNK_SIZE;

/// Default similarity threshold; results must score strictly above it.
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.3;

/// Default maximum number of retrieval results.
pub const DEFAULT_RESULT_LIMIT: usize = 4;

/// Configuration for the embedding side of the pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingConfig {
    /// Embedding model identifier.
    pub model: String,
    /// `OpenAI`-compatible API base URL.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Optional output dimension override.
    pub dimensions: Option<usize>,
    /// HTTP request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Characters per chunk.
    pub chunk_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::from_settings(&RaglineSettings::default())
    }
}

impl EmbeddingConfig {
    /// Create config from settings.
    pub fn from_settings(s: &RaglineSettings) -> Self {
        Self {
            model: s.embedding.model.clone(),
            base_url: s.embedding.base_url.clone(),
            api_key_env: s.embedding.api_key_env.clone(),
            dimensions: s.embedding.dimensions,
            timeout_ms: s.embedding.timeout_ms,
            chunk_size: s.chunking.chunk_size,
        }
    }
}

/// Threshold and limit applied to similarity queries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalConfig {
    /// Results must score strictly above this similarity.
    pub min_similarity: f64,
    /// Maximum number of results.
    pub limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            limit: DEFAULT_RESULT_LIMIT,
        }
    }
}

impl RetrievalConfig {
    /// Create config from settings.
    pub fn from_settings(s: &RaglineSettings) -> Self {
        Self {
            min_similarity: s.retrieval.min_similarity,
            limit: s.retrieval.limit,
        }
    }
}
