//! Error types for PDFQA

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons an ingestion run can fail
///
/// Each variant is a distinct kind so callers can tell a bad file apart from a
/// failing backend.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("cannot read {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("no extractable text in {0}")]
    ExtractionEmpty(String),

    #[error("embedding provider failed: {0}")]
    Embedding(String),

    #[error("vector index failed: {0}")]
    Index(String),
}

/// Core error types for the PDFQA system
#[derive(Error, Debug)]
pub enum Error {
    #[error("Ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("Generation failure: {0}")]
    Generation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(String),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
