//! Bundle loading.

use std::fs;
use std::path::Path;

use crate::error::{PersistenceError, Result};
use crate::types::{ArtifactBundle, CURRENT_SCHEMA_VERSION, MAGIC_BYTES};

pub fn load_bundle(path: &Path) -> Result<ArtifactBundle> {
    let bytes = fs::read(path).map_err(|e| PersistenceError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_bundle_bytes(&bytes, path)
}

fn parse_bundle_bytes(bytes: &[u8], path: &Path) -> Result<ArtifactBundle> {
    if bytes.len() < 10 {
        return Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "file too small".to_string(),
        });
    }
    if bytes[0..4] != MAGIC_BYTES {
        return Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "invalid magic bytes".to_string(),
        });
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version > CURRENT_SCHEMA_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: version,
            max_supported: CURRENT_SCHEMA_VERSION,
            path: path.to_path_buf(),
        });
    }
    let bundle: ArtifactBundle =
        serde_json::from_slice(&bytes[8..]).map_err(|e| PersistenceError::Deserialization {
            path: path.to_path_buf(),
            source: e,
        })?;
    tracing::debug!(key = %bundle.key, path = %path.display(), "loaded artifact bundle");
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_invalid_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.bundle");
        fs::write(&path, b"NOT_A_BUNDLE_FILE").unwrap();
        assert!(matches!(
            load_bundle(&path),
            Err(PersistenceError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_load_unsupported_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.bundle");
        let mut bytes = MAGIC_BYTES.to_vec();
        bytes.extend_from_slice(&99u32.to_le_bytes());
        bytes.extend_from_slice(b"{}{}");
        fs::write(&path, bytes).unwrap();
        assert!(matches!(
            load_bundle(&path),
            Err(PersistenceError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_load_corrupt_payload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.bundle");
        let mut bytes = MAGIC_BYTES.to_vec();
        bytes.extend_from_slice(&CURRENT_SCHEMA_VERSION.to_le_bytes());
        bytes.extend_from_slice(b"{\"key\":");
        fs::write(&path, bytes).unwrap();
        assert!(matches!(
            load_bundle(&path),
            Err(PersistenceError::Deserialization { .. })
        ));
    }
}
