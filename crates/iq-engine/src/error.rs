//! Engine error types.

use thiserror::Error;

/// Errors raised by the engine's collaborators and loaders.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("vector index error: {0}")]
    Index(String),

    #[error("invalid catalog: {0}")]
    Catalog(String),

    #[error("generation error: {0}")]
    Generation(String),

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;
