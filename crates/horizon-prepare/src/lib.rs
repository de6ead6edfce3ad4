//! Leakage-safe feature preparation.
//!
//! Turns a horizon table into model-ready `(X, y)` matrices. Every parameter
//! (feature schema, imputation, scaling) is learned from the training
//! partition only and replayed unchanged on held-out partitions.
//!
//! Steps, in order: drop excluded columns, one-hot encode categoricals,
//! filter to the outcome's risk set, align to the schema, impute, scale.

pub mod encoding;
pub mod error;
pub mod impute;
pub mod matrix;
pub mod pipeline;
pub mod scale;
pub mod schema;

pub use encoding::{UNKNOWN_CATEGORY, one_hot};
pub use error::{PrepareError, Result};
pub use impute::FittedImputer;
pub use matrix::{FeatureMatrix, OutcomeFrame};
pub use pipeline::{
    FittedPipeline, PipelineState, PreparedPartition, TRAIN_PARTITION, UnfitPipeline,
};
pub use scale::FittedScaler;
pub use schema::FeatureSchema;
