//! Persistence error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not a bundle file, or truncated.
    #[error("invalid artifact bundle {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("artifact bundle version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion {
        found: u32,
        max_supported: u32,
        path: PathBuf,
    },

    #[error("failed to serialize artifact bundle")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to deserialize artifact bundle {path}")]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Temp file written but could not be moved into place.
    #[error("failed to move {temp_path} to {target_path}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
