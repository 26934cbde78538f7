//! Cross-module source aggregation.
//!
//! [`ProjectAggregator`] folds every participating module's input
//! directories, tag snapshots and imported-requirement artifacts into one
//! deduplicated [`AggregatedSources`] value. Ordering is deterministic so a
//! hash over the serialized form is a valid build-cache key.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::FilterSettings;
use crate::error::{Result, TraceError};
use crate::snapshot::{ResolvedTagConfig, TagConfigSnapshot};

/// Per-module view of declared specification sources. Owned by one module;
/// the aggregator reads it and never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSources {
    pub name: String,
    pub root: PathBuf,

    /// Directories holding structured specification files.
    pub input_directories: BTreeSet<PathBuf>,

    /// Captured tag-source snapshots.
    pub tag_snapshots: Vec<TagConfigSnapshot>,

    /// Logical dependency coordinates for externally imported requirements.
    pub imported_requirements: Vec<String>,

    pub filter: FilterSettings,
}

impl ModuleSources {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            input_directories: BTreeSet::new(),
            tag_snapshots: Vec::new(),
            imported_requirements: Vec::new(),
            filter: FilterSettings::default(),
        }
    }
}

/// Union of all modules' sources, deduplicated with stable ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedSources {
    pub input_directories: BTreeSet<PathBuf>,

    /// Union of all snapshots' pre-resolved tag files.
    pub tag_paths: BTreeSet<PathBuf>,

    /// Structured tag configurations for the engine, deduplicated and in
    /// canonical sorted order so the serialized form is independent of the
    /// module list's order.
    pub tag_configs: Vec<ResolvedTagConfig>,

    /// Resolved external requirement artifacts.
    pub imported_artifacts: BTreeSet<PathBuf>,

    /// Root module's filter settings (root-wins, see [`ProjectAggregator`]).
    pub filter: FilterSettings,
}

impl AggregatedSources {
    /// SHA-256 over the canonical serialized form. Reproducible for
    /// identical inputs, usable as a build-cache key.
    pub fn digest(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Resolves a logical dependency coordinate into concrete local artifact
/// files. Implemented by the host's dependency-resolution machinery; test
/// stubs implement it in-memory.
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    async fn resolve(&self, coordinate: &str) -> Result<Vec<PathBuf>>;
}

/// Walks the participating modules and merges their declared sources.
pub struct ProjectAggregator {
    resolver: Arc<dyn ArtifactResolver>,
}

impl ProjectAggregator {
    pub fn new(resolver: Arc<dyn ArtifactResolver>) -> Self {
        Self { resolver }
    }

    /// Aggregate `modules` into one [`AggregatedSources`].
    ///
    /// Filter settings are root-scoped: only the module named `root_module`
    /// contributes its `FilterSettings`; per-module filters on other modules
    /// are ignored by contract, not merged. Imported-requirement coordinates
    /// are resolved concurrently but folded back in first-seen order so the
    /// result is deterministic.
    pub async fn aggregate(
        &self,
        modules: &[ModuleSources],
        root_module: &str,
    ) -> Result<AggregatedSources> {
        let mut aggregated = AggregatedSources::default();

        for module in modules {
            aggregated
                .input_directories
                .extend(module.input_directories.iter().cloned());
            for snapshot in &module.tag_snapshots {
                aggregated.tag_paths.extend(snapshot.paths().cloned());
                for config in snapshot.configs() {
                    if !aggregated.tag_configs.contains(config) {
                        aggregated.tag_configs.push(config.clone());
                    }
                }
            }
        }
        // Canonical order: the digest must not depend on module order.
        aggregated.tag_configs.sort_by_key(|c| {
            (
                c.pattern.to_string(),
                c.covered_artifact_type.clone(),
                c.tag_artifact_type.clone(),
                c.covered_item_name_prefix.clone(),
            )
        });

        aggregated.imported_artifacts = self.resolve_imports(modules).await?;

        aggregated.filter = match modules.iter().find(|m| m.name == root_module) {
            Some(root) => root.filter.clone(),
            None => {
                warn!(root_module, "root module not found, filters disabled");
                FilterSettings::default()
            }
        };

        debug!(
            dirs = aggregated.input_directories.len(),
            tag_paths = aggregated.tag_paths.len(),
            tag_configs = aggregated.tag_configs.len(),
            artifacts = aggregated.imported_artifacts.len(),
            "aggregated module sources"
        );
        Ok(aggregated)
    }

    /// Resolve every module's imported-requirement coordinates.
    ///
    /// Duplicate coordinates across modules are resolved once and collapse
    /// silently. Resolution runs concurrently; results are restored to
    /// first-seen coordinate order before the fold.
    async fn resolve_imports(&self, modules: &[ModuleSources]) -> Result<BTreeSet<PathBuf>> {
        let mut coordinates: Vec<String> = Vec::new();
        for module in modules {
            for coordinate in &module.imported_requirements {
                if !coordinates.contains(coordinate) {
                    coordinates.push(coordinate.clone());
                }
            }
        }

        let mut join_set = JoinSet::new();
        for (idx, coordinate) in coordinates.iter().cloned().enumerate() {
            let resolver = Arc::clone(&self.resolver);
            join_set.spawn(async move {
                let files = resolver.resolve(&coordinate).await?;
                Ok::<(usize, String, Vec<PathBuf>), TraceError>((idx, coordinate, files))
            });
        }

        let mut ordered: Vec<Option<(String, Vec<PathBuf>)>> = vec![None; coordinates.len()];
        while let Some(joined) = join_set.join_next().await {
            let (idx, coordinate, files) = joined.map_err(|e| TraceError::ArtifactResolution {
                coordinate: "<join>".to_string(),
                detail: format!("resolution task join error: {e}"),
            })??;
            ordered[idx] = Some((coordinate, files));
        }

        let mut artifacts = BTreeSet::new();
        for slot in ordered.into_iter().flatten() {
            let (coordinate, files) = slot;
            info!(coordinate = %coordinate, files = files.len(), "resolved imported requirements");
            artifacts.extend(files);
        }
        Ok(artifacts)
    }
}
