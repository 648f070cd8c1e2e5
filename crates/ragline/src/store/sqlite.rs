//! `SQLite` vector store.
//!
//! Embeddings are little-endian `f32` BLOBs. Each connection gets a
//! deterministic `cosine_distance(a, b)` scalar function, so threshold,
//! ordering and limit all run inside one `SELECT`.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{quote_ident, sql_limit, SimilarityQuery, VectorStore};
use crate::errors::{EmbeddingError, Result};
use crate::normalize::{blob_to_f32_vec, cosine_distance, f32_slice_to_blob};
use crate::types::{EmbeddingRecord, SimilarityResult, StoredEmbedding};

/// Name of the registered SQL distance function.
pub const COSINE_DISTANCE_FN: &str = "cosine_distance";

/// Vector store over a single `SQLite` connection.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteVectorStore {
    /// Wrap an open connection, register the distance function and create
    /// `table` if missing.
    pub fn new(conn: Connection, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if table.trim().is_empty() {
            return Err(EmbeddingError::InvalidArgument(
                "table name is required".into(),
            ));
        }
        register_cosine_distance(&conn)?;
        let store = Self {
            conn: Mutex::new(conn),
            table,
        };
        store.ensure_table()?;
        Ok(store)
    }

    /// Open (or create) a database file. Parent directories are created.
    pub fn open(path: &Path, table: impl Into<String>) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                EmbeddingError::Storage(format!("create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened sqlite vector store");
        Self::new(conn, table)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(table: impl Into<String>) -> Result<Self> {
        Self::new(Connection::open_in_memory()?, table)
    }

    /// Unquoted table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the embeddings table if it doesn't exist.
    pub fn ensure_table(&self) -> Result<()> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL
            )",
            quote_ident(&self.table)
        );
        self.conn.lock().execute_batch(&ddl)?;
        Ok(())
    }

    /// Whether the embeddings table exists.
    pub fn has_table(&self) -> bool {
        self.conn
            .lock()
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![self.table],
                |row| row.get::<_, i64>(0),
            )
            .is_ok_and(|c| c > 0)
    }

    /// Number of stored rows.
    pub fn count(&self) -> Result<usize> {
        let sql = format!("SELECT count(*) FROM {}", quote_ident(&self.table));
        let count: i64 = self.conn.lock().query_row(&sql, [], |row| row.get(0))?;
        usize::try_from(count).map_err(|e| EmbeddingError::Storage(e.to_string()))
    }

    /// Fetch one row by id.
    pub fn get(&self, id: i64) -> Result<Option<StoredEmbedding>> {
        let sql = format!(
            "SELECT id, content, embedding FROM {} WHERE id = ?1",
            quote_ident(&self.table)
        );
        let row = self
            .conn
            .lock()
            .query_row(&sql, params![id], |row| {
                Ok(StoredEmbedding {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    embedding: blob_to_f32_vec(&row.get::<_, Vec<u8>>(2)?),
                })
            })
            .optional()?;
        Ok(row)
    }

    fn insert_rows(&self, records: &[EmbeddingRecord]) -> Result<Vec<i64>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "INSERT INTO {} (content, embedding) VALUES (?1, ?2)",
            quote_ident(&self.table)
        );
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                let _ = stmt.execute(params![record.content, f32_slice_to_blob(&record.embedding)])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        debug!(table = %self.table, rows = ids.len(), "inserted embeddings");
        Ok(ids)
    }

    fn query_similar(&self, query: &[f32], opts: &SimilarityQuery) -> Result<Vec<SimilarityResult>> {
        let sql = similarity_sql(&self.table);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                f32_slice_to_blob(query),
                opts.min_similarity,
                sql_limit(opts.limit)
            ],
            |row| {
                #[allow(clippy::cast_possible_truncation)]
                let similarity = row.get::<_, f64>(1)? as f32;
                Ok(SimilarityResult {
                    content: row.get(0)?,
                    similarity,
                })
            },
        )?;
        let results = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(table = %self.table, matches = results.len(), "similarity query");
        Ok(results)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert(&self, records: &[EmbeddingRecord]) -> Result<Vec<i64>> {
        self.insert_rows(records)
    }

    async fn find_similar(
        &self,
        query: &[f32],
        opts: &SimilarityQuery,
    ) -> Result<Vec<SimilarityResult>> {
        self.query_similar(query, opts)
    }
}

/// `?1` query blob, `?2` exclusive threshold, `?3` limit.
fn similarity_sql(table: &str) -> String {
    format!(
        "SELECT content, similarity FROM (
            SELECT content, 1.0 - {COSINE_DISTANCE_FN}(embedding, ?1) AS similarity
            FROM {}
        )
        WHERE similarity > ?2
        ORDER BY similarity DESC
        LIMIT ?3",
        quote_ident(table)
    )
}

/// Register `cosine_distance(blob, blob) -> REAL` on `conn`.
///
/// Vectors of different lengths raise a user-function error, which aborts
/// the statement.
fn register_cosine_distance(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        COSINE_DISTANCE_FN,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let a = blob_to_f32_vec(&ctx.get::<Vec<u8>>(0)?);
            let b = blob_to_f32_vec(&ctx.get::<Vec<u8>>(1)?);
            cosine_distance(&a, &b).map(f64::from).ok_or_else(|| {
                rusqlite::Error::UserFunctionError(
                    format!("dimension mismatch: {} vs {}", a.len(), b.len()).into(),
                )
            })
        },
    )?;
    Ok(())
}
