//! Query-time retrieval: embed the question, ask the store for neighbours.

use std::sync::Arc;

use tracing::debug;

use crate::config::RetrievalConfig;
use crate::embedder::Embedder;
use crate::errors::Result;
use crate::store::{SimilarityQuery, VectorStore};
use crate::types::SimilarityResult;

/// Finds stored chunks similar to a query string.
#[derive(Clone)]
pub struct Retriever {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    config: RetrievalConfig,
}

impl Retriever {
    /// Create a retriever with an explicit threshold and limit.
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>, config: RetrievalConfig) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Threshold and limit applied to every query.
    pub fn config(&self) -> RetrievalConfig {
        self.config
    }

    /// Up to `limit` stored chunks with similarity above `min_similarity`,
    /// most similar first.
    ///
    /// The store is not queried if embedding the query fails.
    pub async fn find_relevant(&self, query: &str) -> Result<Vec<SimilarityResult>> {
        let embedding = self.embedder.embed_one(query).await?;
        let results = self
            .store
            .find_similar(&embedding, &SimilarityQuery::from(self.config))
            .await?;
        debug!(
            matches = results.len(),
            min_similarity = self.config.min_similarity,
            limit = self.config.limit,
            "retrieved"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EmbeddingError;
    use crate::service::MockEmbeddingService;
    use crate::store::SqliteVectorStore;
    use crate::types::EmbeddingRecord;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records queries and returns a canned answer.
    #[derive(Default)]
    struct RecordingStore {
        queries: Mutex<Vec<(Vec<f32>, SimilarityQuery)>>,
    }

    #[async_trait]
    impl VectorStore for RecordingStore {
        async fn insert(&self, _records: &[EmbeddingRecord]) -> Result<Vec<i64>> {
            Ok(Vec::new())
        }

        async fn find_similar(
            &self,
            query: &[f32],
            opts: &SimilarityQuery,
        ) -> Result<Vec<SimilarityResult>> {
            self.queries.lock().push((query.to_vec(), *opts));
            Ok(vec![SimilarityResult {
                content: "hit".into(),
                similarity: 0.9,
            }])
        }
    }

    struct FailingStore;

    #[async_trait]
    impl VectorStore for FailingStore {
        async fn insert(&self, _records: &[EmbeddingRecord]) -> Result<Vec<i64>> {
            Err(EmbeddingError::Storage("down".into()))
        }

        async fn find_similar(
            &self,
            _query: &[f32],
            _opts: &SimilarityQuery,
        ) -> Result<Vec<SimilarityResult>> {
            Err(EmbeddingError::Storage("down".into()))
        }
    }

    fn mock() -> Arc<MockEmbeddingService> {
        Arc::new(
            MockEmbeddingService::new(3)
                .with_fixture("cat", vec![1.0, 0.0, 0.0])
                .with_fixture("dog", vec![0.0, 1.0, 0.0]),
        )
    }

    fn retriever(svc: Arc<MockEmbeddingService>, store: Arc<dyn VectorStore>) -> Retriever {
        let embedder = Embedder::new(svc, "text-embedding-ada-002", 1000);
        Retriever::new(embedder, store, RetrievalConfig::default())
    }

    #[tokio::test]
    async fn passes_query_embedding_and_defaults_to_store() {
        let store = Arc::new(RecordingStore::default());
        let results = retriever(mock(), store.clone())
            .find_relevant("cat")
            .await
            .unwrap();
        assert_eq!(results[0].content, "hit");

        let queries = store.queries.lock();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].0, vec![1.0, 0.0, 0.0]);
        assert_eq!(queries[0].1, SimilarityQuery::default());
    }

    #[tokio::test]
    async fn embedding_failure_skips_store() {
        let svc = mock();
        svc.set_failing(true);
        let store = Arc::new(RecordingStore::default());
        let err = retriever(svc, store.clone())
            .find_relevant("cat")
            .await
            .unwrap_err();
        assert!(err.is_provider_error());
        assert!(store.queries.lock().is_empty());
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let err = retriever(mock(), Arc::new(FailingStore))
            .find_relevant("cat")
            .await
            .unwrap_err();
        assert!(err.is_store_error());
    }

    #[tokio::test]
    async fn results_bounded_filtered_and_sorted() {
        let svc = mock();
        let store = SqliteVectorStore::open_in_memory("embeddings").unwrap();
        let records: Vec<EmbeddingRecord> = (0..10u8)
            .map(|i| EmbeddingRecord {
                content: format!("doc {i}"),
                embedding: vec![1.0, f32::from(i) * 0.4, 0.0],
            })
            .collect();
        let _ = store.insert(&records).await.unwrap();

        let results = retriever(svc, Arc::new(store))
            .find_relevant("cat")
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert!(results.len() <= 4);
        assert!(results.iter().all(|r| r.similarity > 0.3));
        assert!(results.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        assert_eq!(results[0].content, "doc 0");
    }

    #[tokio::test]
    #[allow(clippy::float_cmp)]
    async fn settings_threshold_reaches_store_unrounded() {
        let mut settings = ragline_settings::RaglineSettings::default();
        settings.retrieval.min_similarity = 0.300_000_001;
        let store = Arc::new(RecordingStore::default());
        let r = Retriever::new(
            Embedder::new(mock(), "m", 1000),
            store.clone(),
            RetrievalConfig::from_settings(&settings),
        );
        let _ = r.find_relevant("cat").await.unwrap();
        assert_eq!(store.queries.lock()[0].1.min_similarity, 0.300_000_001);
    }

    #[tokio::test]
    async fn custom_config_is_used() {
        let store = Arc::new(RecordingStore::default());
        let embedder = Embedder::new(mock(), "m", 1000);
        let config = RetrievalConfig {
            min_similarity: 0.8,
            limit: 2,
        };
        let r = Retriever::new(embedder, store.clone(), config);
        let _ = r.find_relevant("dog").await.unwrap();
        assert_eq!(r.config(), config);
        assert_eq!(store.queries.lock()[0].1.limit, 2);
    }
}
