use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid encounter id: {0:?}")]
    InvalidEncounterId(String),
    #[error("unknown outcome '{0}' (expected death, vasopressor or ventilator)")]
    UnknownOutcome(String),
    #[error("horizon list is empty")]
    EmptyHorizons,
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
