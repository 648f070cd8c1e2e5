//! Knowledge base: wires the embedder, the store and the retriever together.

use std::path::Path;
use std::sync::Arc;

use ragline_settings::{RaglineSettings, StoreBackend};
use tracing::{debug, info};

use crate::config::{EmbeddingConfig, RetrievalConfig};
use crate::embedder::Embedder;
use crate::errors::{EmbeddingError, Result};
use crate::openai::OpenAiEmbeddingService;
use crate::retriever::Retriever;
use crate::service::EmbeddingService;
use crate::store::{SqliteVectorStore, VectorStore};
use crate::types::SimilarityResult;

/// Ingests documents and answers similarity queries over them.
#[derive(Clone)]
pub struct KnowledgeBase {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    retriever: Retriever,
}

impl KnowledgeBase {
    /// Build from explicit parts.
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>, retrieval: RetrievalConfig) -> Self {
        let retriever = Retriever::new(embedder.clone(), store.clone(), retrieval);
        Self {
            embedder,
            store,
            retriever,
        }
    }

    /// Build the `OpenAI` service and open the configured store.
    pub async fn from_settings(settings: &RaglineSettings) -> Result<Self> {
        let config = EmbeddingConfig::from_settings(settings);
        let service = Arc::new(OpenAiEmbeddingService::from_config(&config)?);
        Self::from_settings_with_service(settings, service).await
    }

    /// Open the configured store but embed through `service`.
    pub async fn from_settings_with_service(
        settings: &RaglineSettings,
        service: Arc<dyn EmbeddingService>,
    ) -> Result<Self> {
        settings.validate()?;
        let embedder = Embedder::from_config(service, &EmbeddingConfig::from_settings(settings));
        let store = open_store(settings).await?;
        Ok(Self::new(
            embedder,
            store,
            RetrievalConfig::from_settings(settings),
        ))
    }

    /// The embedder used for ingestion and queries.
    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Chunk and embed `text`, then persist every chunk. Returns row ids.
    pub async fn ingest(&self, text: &str) -> Result<Vec<i64>> {
        let records = self.embedder.generate_embeddings(text).await?;
        let ids = self.store.insert(&records).await?;
        info!(
            chars = text.chars().count(),
            chunks = ids.len(),
            model = %self.embedder.model(),
            "ingested document"
        );
        Ok(ids)
    }

    /// Stored chunks most similar to `query`.
    pub async fn find_relevant(&self, query: &str) -> Result<Vec<SimilarityResult>> {
        self.retriever.find_relevant(query).await
    }
}

async fn open_store(settings: &RaglineSettings) -> Result<Arc<dyn VectorStore>> {
    let store = &settings.store;
    match store.backend {
        StoreBackend::Sqlite => {
            let path = store.resolved_sqlite_path();
            debug!(path = %path, table = %store.table, "opening sqlite store");
            Ok(Arc::new(SqliteVectorStore::open(Path::new(&path), store.table.clone())?))
        }
        StoreBackend::Postgres => open_postgres(settings).await,
    }
}

#[cfg(feature = "postgres")]
async fn open_postgres(settings: &RaglineSettings) -> Result<Arc<dyn VectorStore>> {
    use crate::store::{PgVectorStore, TableName};

    let store = &settings.store;
    let url = store
        .database_url
        .as_deref()
        .ok_or_else(|| EmbeddingError::Config("store.databaseUrl is required for postgres".into()))?;
    let table = TableName::new(store.schema.clone(), store.table.clone())?;
    let pg = PgVectorStore::connect(url, table).await?;
    pg.ensure_table(settings.embedding.dimensions).await?;
    Ok(Arc::new(pg))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(_settings: &RaglineSettings) -> Result<Arc<dyn VectorStore>> {
    Err(EmbeddingError::Config(
        "postgres backend requires the `postgres` feature".into(),
    ))
}
