//! Records flowing through the pipeline.

use serde::{Deserialize, Serialize};

/// A chunk paired with its embedding, ready to be persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Chunk text submitted to the embedding model.
    pub content: String,
    /// Model embedding vector.
    pub embedding: Vec<f32>,
}

/// A persisted [`EmbeddingRecord`] plus its store-assigned identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredEmbedding {
    /// Store-assigned row identifier.
    pub id: i64,
    /// Chunk text.
    pub content: String,
    /// Stored embedding vector.
    pub embedding: Vec<f32>,
}

/// A retrieved chunk and its cosine similarity to the query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Stored chunk text.
    pub content: String,
    /// `1 - cosine_distance(stored, query)`.
    pub similarity: f32,
}
