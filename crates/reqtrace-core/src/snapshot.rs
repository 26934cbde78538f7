//! Immutable tag-source snapshots.
//!
//! Tag-source blocks are declared against a live module handle at
//! configuration time. Before they cross the pipeline boundary they are
//! frozen into a [`TagConfigSnapshot`]: a plain serializable value holding
//! the resolved pattern, artifact-type metadata, the captured name prefix
//! and the absolute file set each pattern expanded to. Resolution happens
//! exactly once, here; downstream stages never re-resolve.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::TagSourceConfig;
use crate::error::Result;
use crate::pattern::{resolve_name_prefix, PathPattern};

/// One tag-source configuration after capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTagConfig {
    /// Pattern rewritten relative to the build root, scheme preserved.
    pub pattern: PathPattern,

    pub covered_artifact_type: String,
    pub tag_artifact_type: String,

    /// Frozen at capture time; a later module rename does not change it.
    pub covered_item_name_prefix: String,

    /// Absolute files the pattern expanded to, sorted.
    pub paths: Vec<PathBuf>,
}

impl ResolvedTagConfig {
    /// Human-readable description used in logs.
    pub fn describe(&self) -> String {
        format!(
            "{} (type {}): covers '{}', prefix: '{}'",
            self.pattern, self.tag_artifact_type, self.covered_artifact_type,
            self.covered_item_name_prefix
        )
    }
}

/// Ordered, immutable list of resolved tag-source configurations for one
/// module. An empty snapshot is valid: a module without tag sources simply
/// contributes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagConfigSnapshot {
    tag_configs: Vec<ResolvedTagConfig>,
}

impl TagConfigSnapshot {
    /// Freeze `configs` declared by the module rooted at `module_root`.
    ///
    /// Patterns are resolved relative to `build_root` and expanded against
    /// the files currently under the module root. Name prefixes default to
    /// `"<module_name>."` when unset.
    pub fn capture(
        module_name: &str,
        module_root: &Path,
        build_root: &Path,
        configs: &[TagSourceConfig],
    ) -> Result<Self> {
        let module_rel = module_root
            .strip_prefix(build_root)
            .unwrap_or_else(|_| Path::new(""))
            .to_string_lossy()
            .replace('\\', "/");

        let mut tag_configs = Vec::with_capacity(configs.len());
        for config in configs {
            let paths = expand_pattern(&config.pattern, module_root)?;
            let resolved = ResolvedTagConfig {
                pattern: config.pattern.resolve(&module_rel),
                covered_artifact_type: config.covered_artifact_type.clone(),
                tag_artifact_type: config.tag_artifact_type.clone(),
                covered_item_name_prefix: resolve_name_prefix(
                    config.covered_item_name_prefix.as_deref(),
                    module_name,
                ),
                paths,
            };
            debug!(module = module_name, config = %resolved.describe(),
                files = resolved.paths.len(), "captured tag source");
            tag_configs.push(resolved);
        }
        Ok(Self { tag_configs })
    }

    pub fn configs(&self) -> &[ResolvedTagConfig] {
        &self.tag_configs
    }

    /// All pre-resolved files across the snapshot's configurations.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.tag_configs.iter().flat_map(|c| c.paths.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.tag_configs.is_empty()
    }
}

/// Expand a pattern to the sorted absolute file set under `module_root`.
fn expand_pattern(pattern: &PathPattern, module_root: &Path) -> Result<Vec<PathBuf>> {
    let matcher = pattern.compile()?;
    let mut paths = Vec::new();
    for entry in WalkDir::new(module_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(module_root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        if matcher.is_match(relative) {
            paths.push(entry.path().to_path_buf());
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn tag_config(pattern: &str, prefix: Option<&str>) -> TagSourceConfig {
        TagSourceConfig {
            pattern: PathPattern::parse(pattern),
            covered_artifact_type: "dsn".to_string(),
            tag_artifact_type: "impl".to_string(),
            covered_item_name_prefix: prefix.map(|p| p.to_string()),
        }
    }

    #[test]
    fn test_capture_expands_glob_to_sorted_file_set() {
        let dir = tempdir().expect("tempdir");
        let module = dir.path().join("module-a");
        fs::create_dir_all(module.join("src")).unwrap();
        fs::write(module.join("src/B.java"), "").unwrap();
        fs::write(module.join("src/A.java"), "").unwrap();
        fs::write(module.join("src/ignored.rs"), "").unwrap();

        let snapshot = TagConfigSnapshot::capture(
            "module-a",
            &module,
            dir.path(),
            &[tag_config("glob:**/*.java", None)],
        )
        .expect("capture");

        let config = &snapshot.configs()[0];
        assert_eq!(config.pattern.to_string(), "glob:module-a/**/*.java");
        assert_eq!(
            config.paths,
            vec![module.join("src/A.java"), module.join("src/B.java")]
        );
    }

    #[test]
    fn test_capture_freezes_default_name_prefix() {
        let dir = tempdir().expect("tempdir");
        let module = dir.path().join("module-a");
        fs::create_dir_all(&module).unwrap();

        let snapshot = TagConfigSnapshot::capture(
            "module-a",
            &module,
            dir.path(),
            &[tag_config("glob:**/*.java", None)],
        )
        .expect("capture");

        // Includes the trailing dot, captured at snapshot time.
        assert_eq!(
            snapshot.configs()[0].covered_item_name_prefix,
            "module-a."
        );
    }

    #[test]
    fn test_capture_keeps_explicit_prefix_verbatim() {
        let dir = tempdir().expect("tempdir");
        let module = dir.path().join("module-a");
        fs::create_dir_all(&module).unwrap();

        let snapshot = TagConfigSnapshot::capture(
            "module-a",
            &module,
            dir.path(),
            &[tag_config("glob:**/*.java", Some("legacy"))],
        )
        .expect("capture");

        assert_eq!(snapshot.configs()[0].covered_item_name_prefix, "legacy");
    }

    #[test]
    fn test_empty_snapshot_is_valid() {
        let dir = tempdir().expect("tempdir");
        let snapshot =
            TagConfigSnapshot::capture("root", dir.path(), dir.path(), &[]).expect("capture");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.paths().count(), 0);
    }

    #[test]
    fn test_snapshot_survives_serialization() {
        let dir = tempdir().expect("tempdir");
        let module = dir.path().join("m");
        fs::create_dir_all(&module).unwrap();
        fs::write(module.join("tagged.java"), "").unwrap();

        let snapshot = TagConfigSnapshot::capture(
            "m",
            &module,
            dir.path(),
            &[tag_config("glob:*.java", None)],
        )
        .expect("capture");

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: TagConfigSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
