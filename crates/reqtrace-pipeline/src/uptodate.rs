//! Incremental-skip support: content fingerprints over a stage's inputs,
//! recorded next to the stage's output.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;

/// A hex-encoded digest over everything a stage reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Hash configuration fragments plus the contents of the given files.
/// Directories are walked in sorted order; a missing path contributes a
/// distinct marker so that appearing or disappearing inputs change the
/// digest.
pub fn fingerprint(parts: &[&[u8]], files: &[PathBuf]) -> Result<Fingerprint> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    for file in files {
        hash_path(&mut hasher, file)?;
    }
    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

fn hash_path(hasher: &mut Sha256, path: &Path) -> Result<()> {
    if path.is_dir() {
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            hash_file(hasher, entry.path())?;
        }
        Ok(())
    } else if path.is_file() {
        hash_file(hasher, path)
    } else {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\0absent");
        Ok(())
    }
}

fn hash_file(hasher: &mut Sha256, path: &Path) -> Result<()> {
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(b"\0");
    let bytes = std::fs::read(path)?;
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(&bytes);
    Ok(())
}

fn marker_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    name.push_str(".fingerprint");
    output.with_file_name(name)
}

/// An output is up to date when it exists and its recorded fingerprint
/// matches the current one.
pub fn is_up_to_date(output: &Path, current: &Fingerprint) -> bool {
    if !output.exists() {
        return false;
    }
    match std::fs::read_to_string(marker_path(output)) {
        Ok(recorded) => {
            let fresh = recorded.trim() == current.as_str();
            if fresh {
                debug!(output = %output.display(), "output is up to date");
            }
            fresh
        }
        Err(_) => false,
    }
}

/// Record the fingerprint of a freshly produced output.
pub fn record(output: &Path, current: &Fingerprint) -> Result<()> {
    std::fs::write(marker_path(output), format!("{}\n", current.as_str()))?;
    Ok(())
}
