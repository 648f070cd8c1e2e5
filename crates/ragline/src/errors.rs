//! Pipeline error types.
//!
//! Errors from the embedding provider and the vector store are propagated
//! unchanged to the caller. Nothing here retries.

use thiserror::Error;

/// Errors from chunking, embedding, and retrieval.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Transport-level failure talking to the embedding provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The embedding provider answered with a non-success status.
    #[error("Provider error ({status}): {message}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Provider-specific error code.
        code: Option<String>,
    },

    /// The provider answered, but not with what was asked for.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// `SQLite` error (preserves source chain).
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Postgres error (preserves source chain).
    #[cfg(feature = "postgres")]
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Vector storage operation failed (non-driver).
    #[error("Storage failed: {0}")]
    Storage(String),

    /// Caller broke an argument contract.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}

impl EmbeddingError {
    /// Error category string for logging and metrics labels.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) | Self::Provider { .. } | Self::MalformedResponse(_) => "provider",
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => "store",
            Self::Sqlite(_) | Self::Storage(_) => "store",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Config(_) => "config",
        }
    }

    /// Whether the embedding provider is the origin of this error.
    pub fn is_provider_error(&self) -> bool {
        self.category() == "provider"
    }

    /// Whether the vector store is the origin of this error.
    pub fn is_store_error(&self) -> bool {
        self.category() == "store"
    }
}

impl From<ragline_settings::SettingsError> for EmbeddingError {
    fn from(err: ragline_settings::SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;
