//! Embedder: chunk text and turn it into vectors with a fixed model.

use std::sync::Arc;

use tracing::debug;

use crate::chunker::chunk_text;
use crate::config::EmbeddingConfig;
use crate::errors::{EmbeddingError, Result};
use crate::service::EmbeddingService;
use crate::types::EmbeddingRecord;

/// Number of leading vector components shown in diagnostics.
const PREVIEW_LEN: usize = 6;

/// Maps text to embeddings through an [`EmbeddingService`] using one model.
#[derive(Clone)]
pub struct Embedder {
    service: Arc<dyn EmbeddingService>,
    model: String,
    chunk_size: usize,
}

impl Embedder {
    /// Create an embedder that always requests `model`.
    pub fn new(service: Arc<dyn EmbeddingService>, model: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            service,
            model: model.into(),
            chunk_size,
        }
    }

    /// Create an embedder from config.
    pub fn from_config(service: Arc<dyn EmbeddingService>, config: &EmbeddingConfig) -> Self {
        Self::new(service, config.model.clone(), config.chunk_size)
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Characters per chunk used by [`Embedder::generate_embeddings`].
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Embed `values` in one provider call, pairing each vector with its input.
    pub async fn embed_batch(&self, values: &[String]) -> Result<Vec<EmbeddingRecord>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self.service.embed(&self.model, values).await?;
        if embeddings.len() != values.len() {
            return Err(EmbeddingError::MalformedResponse(format!(
                "{} embeddings for {} inputs",
                embeddings.len(),
                values.len()
            )));
        }
        Ok(values
            .iter()
            .zip(embeddings)
            .map(|(content, embedding)| EmbeddingRecord {
                content: content.clone(),
                embedding,
            })
            .collect())
    }

    /// Chunk `value` with the configured chunk size and embed every chunk.
    pub async fn generate_embeddings(&self, value: &str) -> Result<Vec<EmbeddingRecord>> {
        let chunks: Vec<String> = chunk_text(value, self.chunk_size)?
            .into_iter()
            .map(str::to_owned)
            .collect();
        debug!(chunks = chunks.len(), chunk_size = self.chunk_size, "chunked input");
        self.embed_batch(&chunks).await
    }

    /// Embed a single string.
    ///
    /// Newlines are replaced with spaces before the request; embedding
    /// models score literal newlines differently from whitespace.
    pub async fn embed_one(&self, value: &str) -> Result<Vec<f32>> {
        debug!(model = %self.model, input = value, "generating embedding");
        let input = value.replace('\n', " ");
        let embedding = self.service.embed_single(&self.model, &input).await?;
        debug!(
            model = %self.model,
            dims = embedding.len(),
            preview = %preview(&embedding),
            "generated embedding"
        );
        Ok(embedding)
    }
}

/// `[a, b, c, ...]` rendering of the first few components.
fn preview(embedding: &[f32]) -> String {
    let head: Vec<String> = embedding
        .iter()
        .take(PREVIEW_LEN)
        .map(ToString::to_string)
        .collect();
    if embedding.len() > PREVIEW_LEN {
        format!("[{}, ...]", head.join(", "))
    } else {
        format!("[{}]", head.join(", "))
    }
}
