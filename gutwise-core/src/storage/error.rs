//! Storage error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a storage medium or by value (de)serialization.
///
/// These never leave [`PersistentStore`](super::PersistentStore); its public
/// operations log them and report `false` or `None` instead.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error for {}: {1}", .0.display())]
    Io(PathBuf, #[source] io::Error),

    #[error("Failed to serialize value for '{0}': {1}")]
    Serialize(String, #[source] serde_json::Error),

    #[error("Failed to deserialize value for '{0}': {1}")]
    Deserialize(String, #[source] serde_json::Error),

    #[error("Storage medium unavailable: {0}")]
    Unavailable(String),
}
