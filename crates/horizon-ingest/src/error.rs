//! Error types for input table ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading the input tables.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    #[error("CSV file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported encoding {encoding} in {path} (expected UTF-8)")]
    UnsupportedEncoding {
        path: PathBuf,
        encoding: &'static str,
    },

    // === CSV Parsing Errors ===
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// Header present but no data rows, for tables that require rows.
    #[error("CSV file has no data rows: {path}")]
    EmptyTable { path: PathBuf },

    #[error("CSV file {path} has an empty column name")]
    EmptyColumnName { path: PathBuf },

    // === Shape Errors ===
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("duplicate encounter id '{encounter_id}' in {path}")]
    DuplicateEncounter { encounter_id: String, path: PathBuf },

    // === DataFrame Errors ===
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
