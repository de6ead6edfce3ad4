//! Cached artifact types.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use horizon_model::{Horizon, OutcomeKind};
use horizon_prepare::{FittedImputer, FittedPipeline, FittedScaler, PreparedPartition};
use serde::{Deserialize, Serialize};

/// File identification prefix of a bundle.
pub const MAGIC_BYTES: [u8; 4] = *b"HZB\x01";

/// Current bundle schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Bundle file extension.
pub const BUNDLE_EXTENSION: &str = "bundle";

/// Identifies one prepared bundle: `{prefix}_day{h}_{outcome}_seed{seed}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub cohort_prefix: String,
    pub horizon: Horizon,
    pub outcome: OutcomeKind,
    pub seed: u64,
}

impl CacheKey {
    pub fn new(cohort_prefix: impl Into<String>, horizon: Horizon, outcome: OutcomeKind, seed: u64) -> Self {
        Self {
            cohort_prefix: cohort_prefix.into(),
            horizon,
            outcome,
            seed,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{self}.{BUNDLE_EXTENSION}")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_seed{}",
            self.cohort_prefix,
            self.horizon,
            self.outcome.stem(),
            self.seed
        )
    }
}

/// SHA-256 of one input file at the time the bundle was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFingerprint {
    pub path: PathBuf,
    pub sha256: String,
}

/// A held-out partition that could not be prepared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionFailure {
    pub name: String,
    pub message: String,
}

/// Everything produced for one cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub schema_version: u32,
    pub key: CacheKey,
    /// RFC 3339 timestamp.
    pub created_at: String,
    pub pipeline: FittedPipeline,
    pub train: PreparedPartition,
    /// Held-out partitions in the order they were prepared.
    pub held_out: Vec<PreparedPartition>,
    pub failures: Vec<PartitionFailure>,
    pub sources: Vec<SourceFingerprint>,
}

impl ArtifactBundle {
    pub fn new(
        key: CacheKey,
        pipeline: FittedPipeline,
        train: PreparedPartition,
        sources: Vec<SourceFingerprint>,
    ) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            key,
            created_at: Utc::now().to_rfc3339(),
            pipeline,
            train,
            held_out: Vec::new(),
            failures: Vec::new(),
            sources,
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn imputer(&self) -> &FittedImputer {
        self.pipeline.imputer()
    }

    pub fn scaler(&self) -> &FittedScaler {
        self.pipeline.scaler()
    }

    pub fn partition(&self, name: &str) -> Option<&PreparedPartition> {
        if self.train.name == name {
            return Some(&self.train);
        }
        self.held_out.iter().find(|partition| partition.name == name)
    }
}
