//! JSON file persistence helpers
//!
//! Best-effort local persistence for settings blobs. Parent directories are
//! created on write; reads distinguish a missing/unreadable file from a file
//! with malformed contents so callers can decide what is recoverable.

use serde_json::Value;
use std::path::Path;

use crate::error::StorageError;

/// Read and parse a JSON file.
pub async fn read_json(path: &Path) -> Result<Value, StorageError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| StorageError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;

    serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
        path: path.display().to_string(),
        source,
    })
}

/// Serialize a JSON value to a file, creating parent directories as needed.
pub async fn write_json(path: &Path, value: &Value) -> Result<(), StorageError> {
    let write_failed = |source| StorageError::WriteFailed {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let contents = serde_json::to_string_pretty(value).expect("JSON values always serialize");

    tokio::fs::write(path, contents).await.map_err(write_failed)
}

#[cfg(test)]
pub(crate) fn temp_path(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "gurbani-presenter-{}-{}-{}.json",
        tag,
        std::process::id(),
        fastrand::u64(..)
    ))
}
