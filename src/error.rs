//! Error types for the presentation controller

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Schema validation and migration errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The migration chain skips a version. This is a programming error in
    /// the chain itself, not bad runtime data, and is fatal at startup.
    #[error("Migration chain is missing version {0}")]
    BrokenChain(u32),

    #[error("Data version {data} is newer than schema version {current}")]
    FutureVersion { data: u32, current: u32 },

    #[error("Validation failed at version {version}: {source}")]
    Validation {
        version: u32,
        source: serde_json::Error,
    },
}

/// Persistence errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },
}

/// Channel and transport errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Server bind failed: {0}")]
    BindFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
