//! Error types for Tabula

use thiserror::Error;

/// Core error type returned by collaborators (lookup sources, export writers)
#[derive(Error, Debug)]
pub enum TabulaError {
    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Tabula operations
pub type Result<T> = std::result::Result<T, TabulaError>;
