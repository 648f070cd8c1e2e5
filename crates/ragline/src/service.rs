//! Embedding service trait and mock implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::errors::{EmbeddingError, Result};
use crate::normalize::l2_normalize;

/// External embedding model: text in, fixed-length vectors out.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed a batch of texts with `model` in a single request.
    ///
    /// Output order matches input order.
    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text (default: calls `embed` with one item).
    async fn embed_single(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let results = self.embed(model, &[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::MalformedResponse("empty result".into()))
    }
}

/// A request observed by [`MockEmbeddingService`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    /// Model identifier the caller asked for.
    pub model: String,
    /// Inputs exactly as received.
    pub inputs: Vec<String>,
}

/// Mock embedding service for testing.
///
/// Generates deterministic embeddings by hashing input text with SHA-256,
/// unless a fixture vector was registered for that exact text. Every call is
/// recorded so tests can assert on what reached the "provider".
pub struct MockEmbeddingService {
    dims: usize,
    fixtures: HashMap<String, Vec<f32>>,
    calls: Mutex<Vec<RecordedCall>>,
    failing: AtomicBool,
}

impl MockEmbeddingService {
    /// Create a new mock service with the given dimensions.
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            fixtures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Return `vector` whenever `text` is embedded.
    #[must_use]
    pub fn with_fixture(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        let _ = self.fixtures.insert(text.into(), vector);
        self
    }

    /// Make every subsequent call fail with a provider error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Calls received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = hasher.finalize();

        let mut v: Vec<f32> = (0..self.dims)
            .map(|i| {
                let byte_idx = i % hash.len();
                // Map byte to [-1, 1] range
                (f32::from(hash[byte_idx]) / 127.5) - 1.0
            })
            .collect();

        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingService for MockEmbeddingService {
    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.lock().push(RecordedCall {
            model: model.to_string(),
            inputs: texts.to_vec(),
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Provider {
                status: 503,
                message: "mock provider unavailable".into(),
                code: None,
            });
        }
        Ok(texts
            .iter()
            .map(|t| {
                self.fixtures
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| self.hash_to_vector(t))
            })
            .collect())
    }
}
