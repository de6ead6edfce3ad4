//! Input file fingerprints for cache staleness detection.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{PersistenceError, Result};
use crate::types::SourceFingerprint;

/// SHA-256 of a file, hex encoded.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| PersistenceError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| PersistenceError::Io {
            operation: "read",
            path: path.to_path_buf(),
            source: e,
        })?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Returns `Ok(false)` when the file no longer matches `expected_hash`.
pub fn verify_file_hash(path: &Path, expected_hash: &str) -> Result<bool> {
    Ok(compute_file_hash(path)? == expected_hash)
}

pub fn fingerprint_sources(paths: &[PathBuf]) -> Result<Vec<SourceFingerprint>> {
    paths
        .iter()
        .map(|path| {
            Ok(SourceFingerprint {
                path: path.clone(),
                sha256: compute_file_hash(path)?,
            })
        })
        .collect()
}
