//! Keyed artifact cache on top of the bundle files.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use horizon_prepare::UnfitPipeline;

use crate::error::Result;
use crate::io::{load_bundle, save_bundle, verify_file_hash};
use crate::types::{ArtifactBundle, CacheKey, SourceFingerprint};

/// Result of a cache lookup.
#[derive(Debug)]
pub enum CacheLookup {
    /// Usable bundle with matching inputs.
    Hit(Box<ArtifactBundle>),
    /// No bundle stored for the key.
    Miss,
    /// A bundle exists but was built from different inputs or options.
    Stale { reason: String },
    /// A bundle may exist but recomputation was requested.
    Forced,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Directory of bundles, one file per [`CacheKey`].
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    directory: PathBuf,
}

impl ArtifactCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.directory.join(key.file_name())
    }

    /// Looks up `key`, checking that the stored fingerprints match `sources`
    /// and that the stored pipeline was configured like `expected`.
    ///
    /// An unreadable bundle, a changed input or changed preparation options
    /// are reported as stale rather than as an error, so callers simply recompute.
    pub fn lookup(
        &self,
        key: &CacheKey,
        sources: &[SourceFingerprint],
        expected: &UnfitPipeline,
        force: bool,
    ) -> CacheLookup {
        let path = self.path_for(key);
        if force {
            debug!(key = %key, "cache bypassed by force");
            return CacheLookup::Forced;
        }
        if !path.exists() {
            debug!(key = %key, "cache miss");
            return CacheLookup::Miss;
        }
        let bundle = match load_bundle(&path) {
            Ok(bundle) => bundle,
            Err(err) => {
                warn!(key = %key, error = %err, "unreadable cache entry; recomputing");
                return CacheLookup::Stale {
                    reason: err.to_string(),
                };
            }
        };
        if bundle.key != *key {
            return CacheLookup::Stale {
                reason: format!("bundle was stored for {}", bundle.key),
            };
        }
        if bundle.pipeline.unfit() != expected {
            warn!(key = %key, "preparation options changed; recomputing");
            return CacheLookup::Stale {
                reason: "preparation options changed".to_string(),
            };
        }
        if let Some(reason) = fingerprint_mismatch(&bundle.sources, sources) {
            warn!(key = %key, reason = %reason, "stale cache entry; recomputing");
            return CacheLookup::Stale { reason };
        }
        info!(key = %key, path = %path.display(), "cache hit");
        CacheLookup::Hit(Box::new(bundle))
    }

    pub fn store(&self, bundle: &ArtifactBundle) -> Result<PathBuf> {
        let path = self.path_for(&bundle.key);
        save_bundle(bundle, &path)?;
        Ok(path)
    }
}

fn fingerprint_mismatch(stored: &[SourceFingerprint], current: &[SourceFingerprint]) -> Option<String> {
    if stored.len() != current.len() {
        return Some(format!(
            "bundle has {} input fingerprints, run has {}",
            stored.len(),
            current.len()
        ));
    }
    stored.iter().zip(current).find_map(|(old, new)| {
        if old.path != new.path {
            Some(format!(
                "input {} replaced by {}",
                old.path.display(),
                new.path.display()
            ))
        } else if old.sha256 != new.sha256 {
            Some(format!("input {} has changed", new.path.display()))
        } else {
            None
        }
    })
}

/// Recomputes the fingerprint of each stored input and reports the first changed file.
pub fn verify_sources(bundle: &ArtifactBundle) -> Result<Option<PathBuf>> {
    for source in &bundle.sources {
        if !verify_file_hash(&source.path, &source.sha256)? {
            return Ok(Some(source.path.clone()));
        }
    }
    Ok(None)
}
