//! # ragline
//!
//! Chunk text, embed it with an `OpenAI`-compatible model, persist the
//! vectors and retrieve the stored chunks most similar to a query.
//!
//! - [`chunker`]: fixed-width, character-based slicing
//! - [`embedder`]: batch and single-string embedding with a fixed model
//! - [`retriever`]: threshold/order/limit similarity query against a [`store`]
//! - [`controller`]: [`KnowledgeBase`] facade for ingest and lookup
//!
//! Similarity is computed by the store: `SQLite` through a registered
//! `cosine_distance` function, Postgres (feature `postgres`) through
//! pgvector's `<=>` operator.

#![deny(unsafe_code)]

pub mod chunker;
pub mod config;
pub mod controller;
pub mod embedder;
pub mod errors;
pub mod logging;
pub mod normalize;
pub mod openai;
pub mod retriever;
pub mod service;
pub mod store;
pub mod types;

pub use chunker::{chunk_text, DEFAULT_CHUNK_SIZE};
pub use config::{EmbeddingConfig, RetrievalConfig, DEFAULT_MIN_SIMILARITY, DEFAULT_RESULT_LIMIT};
pub use controller::KnowledgeBase;
pub use embedder::Embedder;
pub use errors::{EmbeddingError, Result};
pub use openai::OpenAiEmbeddingService;
pub use retriever::Retriever;
pub use service::{EmbeddingService, MockEmbeddingService};
pub use store::{SimilarityQuery, SqliteVectorStore, VectorStore};
pub use types::{EmbeddingRecord, SimilarityResult, StoredEmbedding};
