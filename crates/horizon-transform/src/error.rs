use horizon_model::{Horizon, ModelError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("column '{column}' not found")]
    MissingColumn { column: String },

    /// A snapshot at `horizon` saw a row recorded after its cutoff.
    #[error(
        "temporal causality violation: encounter {encounter_id} row at offset {offset} \
         reached horizon {horizon} (cutoff {cutoff})"
    )]
    TemporalCausalityViolation {
        encounter_id: String,
        horizon: Horizon,
        offset: f64,
        cutoff: f64,
    },

    #[error("invalid split: {0}")]
    InvalidSplit(String),

    #[error("failed to write {path}: {message}")]
    Write { path: String, message: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for TransformError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
