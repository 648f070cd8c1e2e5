//! Postgres + pgvector store.
//!
//! Similarity uses pgvector's cosine distance operator `<=>`. Queries share
//! the client through a read lock and pipeline on its connection; only
//! transactional inserts take the write lock.

use async_trait::async_trait;
use pgvector::Vector;
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

use super::{quote_ident, sql_limit, SimilarityQuery, VectorStore};
use crate::errors::{EmbeddingError, Result};
use crate::types::{EmbeddingRecord, SimilarityResult};

/// Fully-qualified table name (schema + table).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    /// Build a table identifier. Both parts must be non-blank.
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        let schema = schema.into();
        let table = table.into();
        if schema.trim().is_empty() || table.trim().is_empty() {
            return Err(EmbeddingError::InvalidArgument(
                "schema and table names are required".into(),
            ));
        }
        Ok(Self { schema, table })
    }

    /// `"schema"."table"` with quoted identifiers.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

/// Vector store backed by a pgvector table.
pub struct PgVectorStore {
    client: RwLock<Client>,
    table: TableName,
}

impl PgVectorStore {
    /// Connect to `database_url`. The connection driver runs on a spawned task.
    pub async fn connect(database_url: &str, table: TableName) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
        let _ = tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(error = %err, "postgres connection error");
            }
        });
        debug!(table = %table.qualified(), "connected pgvector store");
        Ok(Self::from_client(client, table))
    }

    /// Wrap an already connected client.
    pub fn from_client(client: Client, table: TableName) -> Self {
        Self {
            client: RwLock::new(client),
            table,
        }
    }

    /// Enable the `vector` extension and create the table if missing.
    ///
    /// With `dims` set the column is `VECTOR(dims)` and inserts of any other
    /// length are rejected by Postgres.
    pub async fn ensure_table(&self, dims: Option<usize>) -> Result<()> {
        if dims == Some(0) {
            return Err(EmbeddingError::InvalidArgument(
                "embedding dimension must be positive".into(),
            ));
        }
        let client = self.client.read().await;
        let _ = client
            .execute("CREATE EXTENSION IF NOT EXISTS vector", &[])
            .await?;
        let _ = client
            .execute(&create_table_sql(&self.table, dims), &[])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn insert(&self, records: &[EmbeddingRecord]) -> Result<Vec<i64>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let mut client = self.client.write().await;
        let tx = client.transaction().await?;
        let stmt = tx.prepare(&insert_sql(&self.table)).await?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let vector = Vector::from(record.embedding.clone());
            let row = tx.query_one(&stmt, &[&record.content, &vector]).await?;
            ids.push(row.try_get::<_, i64>(0)?);
        }
        tx.commit().await?;
        debug!(table = %self.table.qualified(), rows = ids.len(), "inserted embeddings");
        Ok(ids)
    }

    async fn find_similar(
        &self,
        query: &[f32],
        opts: &SimilarityQuery,
    ) -> Result<Vec<SimilarityResult>> {
        let vector = Vector::from(query.to_vec());
        let threshold = opts.min_similarity;
        let limit = sql_limit(opts.limit);
        let client = self.client.read().await;
        let rows = client
            .query(&similarity_sql(&self.table), &[&vector, &threshold, &limit])
            .await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            #[allow(clippy::cast_possible_truncation)]
            let similarity = row.try_get::<_, f64>(1)? as f32;
            results.push(SimilarityResult {
                content: row.try_get(0)?,
                similarity,
            });
        }
        debug!(table = %self.table.qualified(), matches = results.len(), "similarity query");
        Ok(results)
    }
}

fn create_table_sql(table: &TableName, dims: Option<usize>) -> String {
    let column = dims.map_or_else(|| "VECTOR".to_string(), |d| format!("VECTOR({d})"));
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id BIGSERIAL PRIMARY KEY,
            content TEXT NOT NULL,
            embedding {column} NOT NULL
        )",
        table.qualified()
    )
}

fn insert_sql(table: &TableName) -> String {
    format!(
        "INSERT INTO {} (content, embedding) VALUES ($1, $2) RETURNING id",
        table.qualified()
    )
}

/// `$1` query vector, `$2` exclusive threshold, `$3` limit.
fn similarity_sql(table: &TableName) -> String {
    format!(
        "SELECT content, similarity FROM (
            SELECT content, 1 - (embedding <=> $1) AS similarity
            FROM {}
        ) AS scored
        WHERE similarity > $2
        ORDER BY similarity DESC
        LIMIT $3",
        table.qualified()
    )
}
