//! Local-repository artifact resolution.
//!
//! The host's dependency machinery is abstracted behind
//! [`crate::sources::ArtifactResolver`]; this module provides the built-in
//! implementation used by the CLI: coordinates of the form `name:version`
//! resolve to files named `<name>-<version>.*` in a flat repository
//! directory.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, TraceError};
use crate::sources::ArtifactResolver;

/// Resolves coordinates against a flat on-disk repository directory.
pub struct LocalRepositoryResolver {
    repository: PathBuf,
}

impl LocalRepositoryResolver {
    pub fn new(repository: impl Into<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
        }
    }
}

#[async_trait]
impl ArtifactResolver for LocalRepositoryResolver {
    async fn resolve(&self, coordinate: &str) -> Result<Vec<PathBuf>> {
        let (name, version) =
            coordinate
                .split_once(':')
                .ok_or_else(|| TraceError::ArtifactResolution {
                    coordinate: coordinate.to_string(),
                    detail: "expected '<name>:<version>'".to_string(),
                })?;
        let stem = format!("{name}-{version}");

        let mut files = Vec::new();
        let entries =
            std::fs::read_dir(&self.repository).map_err(|e| TraceError::ArtifactResolution {
                coordinate: coordinate.to_string(),
                detail: format!("cannot read repository {}: {e}", self.repository.display()),
            })?;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(file_stem) if file_stem == stem => files.push(path),
                _ => {}
            }
        }

        if files.is_empty() {
            return Err(TraceError::ArtifactResolution {
                coordinate: coordinate.to_string(),
                detail: format!(
                    "no artifact matching '{stem}.*' in {}",
                    self.repository.display()
                ),
            });
        }
        files.sort();
        debug!(coordinate, files = files.len(), "resolved from local repository");
        Ok(files)
    }
}
