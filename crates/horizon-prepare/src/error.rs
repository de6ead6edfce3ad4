use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepareError {
    /// No rows left to fit or transform. Fatal for this partition only.
    #[error("no rows left in partition '{partition}' after {stage}")]
    DataInsufficient { partition: String, stage: String },

    /// Fit retained no feature columns.
    #[error("schema collapsed: no feature column has a non-null, non-zero training value")]
    SchemaCollapse,

    /// A transform was applied before being fitted.
    #[error("transform applied before fit")]
    UnfitTransform,

    #[error("aligned columns do not match the fitted schema (expected {expected}, got {actual})")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("column '{column}' not found")]
    MissingColumn { column: String },

    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for PrepareError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PrepareError>;
