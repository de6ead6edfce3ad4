//! Cache of prepared horizon artifacts.
//!
//! A bundle holds the fitted pipeline (schema, imputer, scaler), the prepared
//! training partition, every held-out partition with its row index mapping,
//! and SHA-256 fingerprints of the input files it was built from. It is keyed
//! by `{cohort_prefix}_day{horizon}_{outcome}_seed{seed}`.
//!
//! # File Format
//!
//! ```text
//! +------------------+
//! | Magic: "HZB\x01" | 4 bytes
//! +------------------+
//! | Version: 1       | 4 bytes - u32 little-endian schema version
//! +------------------+
//! | JSON payload     | ArtifactBundle
//! +------------------+
//! ```
//!
//! Writes go to a temp file that is synced and renamed into place.

mod cache;
mod error;
mod io;
mod types;

pub use cache::{ArtifactCache, CacheLookup, verify_sources};
pub use error::{PersistenceError, Result};
pub use io::{compute_file_hash, fingerprint_sources, load_bundle, save_bundle, verify_file_hash};
pub use types::{
    ArtifactBundle, BUNDLE_EXTENSION, CURRENT_SCHEMA_VERSION, CacheKey, MAGIC_BYTES,
    PartitionFailure, SourceFingerprint,
};
