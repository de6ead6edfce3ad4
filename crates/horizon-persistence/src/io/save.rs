//! Bundle saving.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::{PersistenceError, Result};
use crate::types::{ArtifactBundle, CURRENT_SCHEMA_VERSION, MAGIC_BYTES};

/// Saves a bundle with an atomic write: temp file, fsync, rename.
///
/// Readers see either the previous file or the complete new one. A failed
/// save removes its temp file.
pub fn save_bundle(bundle: &ArtifactBundle, path: &Path) -> Result<()> {
    let bytes = serialize_bundle(bundle)?;
    let temp_path = path.with_extension("bundle.tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut file = File::create(&temp_path).map_err(|e| PersistenceError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;
    let written = file
        .write_all(&bytes)
        .map_err(|e| ("write", e))
        .and_then(|()| file.sync_all().map_err(|e| ("sync", e)));
    drop(file);
    if let Err((operation, source)) = written {
        discard_temp(&temp_path);
        return Err(PersistenceError::Io {
            operation,
            path: temp_path,
            source,
        });
    }

    if let Err(source) = fs::rename(&temp_path, path) {
        discard_temp(&temp_path);
        return Err(PersistenceError::AtomicWriteFailed {
            temp_path,
            target_path: path.to_path_buf(),
            source,
        });
    }

    tracing::info!(key = %bundle.key, path = %path.display(), "saved artifact bundle");
    Ok(())
}

/// Removes a partial temp file after a failed save.
fn discard_temp(temp_path: &Path) {
    if let Err(err) = fs::remove_file(temp_path) {
        tracing::warn!(path = %temp_path.display(), error = %err, "could not remove temp bundle");
    }
}

/// Format:
/// - 4 bytes: magic (`HZB\x01`)
/// - 4 bytes: schema version (u32 little-endian)
/// - N bytes: JSON payload
fn serialize_bundle(bundle: &ArtifactBundle) -> Result<Vec<u8>> {
    let payload =
        serde_json::to_vec(bundle).map_err(|e| PersistenceError::Serialization { source: e })?;
    let mut output = Vec::with_capacity(8 + payload.len());
    output.extend_from_slice(&MAGIC_BYTES);
    output.extend_from_slice(&CURRENT_SCHEMA_VERSION.to_le_bytes());
    output.extend_from_slice(&payload);
    Ok(output)
}

