//! Vector persistence and in-store similarity search.

#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;

use crate::config::RetrievalConfig;
use crate::errors::Result;
use crate::types::{EmbeddingRecord, SimilarityResult};

#[cfg(feature = "postgres")]
pub use postgres::{PgVectorStore, TableName};
pub use sqlite::SqliteVectorStore;

/// Threshold and limit for a similarity query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityQuery {
    /// Keep rows whose similarity is strictly greater than this.
    pub min_similarity: f64,
    /// Maximum number of rows.
    pub limit: usize,
}

impl Default for SimilarityQuery {
    fn default() -> Self {
        RetrievalConfig::default().into()
    }
}

impl From<RetrievalConfig> for SimilarityQuery {
    fn from(config: RetrievalConfig) -> Self {
        Self {
            min_similarity: config.min_similarity,
            limit: config.limit,
        }
    }
}

/// Storage for `(content, embedding)` rows.
///
/// `find_similar` computes `1 - cosine_distance(stored, query)` inside the
/// store and applies the threshold, descending order, and limit in the same
/// query.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist `records` in one transaction; ids are returned in input order.
    async fn insert(&self, records: &[EmbeddingRecord]) -> Result<Vec<i64>>;

    /// Rows most similar to `query` above the threshold, best first.
    async fn find_similar(
        &self,
        query: &[f32],
        opts: &SimilarityQuery,
    ) -> Result<Vec<SimilarityResult>>;
}

/// Limit as a SQL integer parameter. Values beyond `i64::MAX` saturate.
pub(crate) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Quote a SQL identifier, doubling embedded quotes.
pub(crate) fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}
