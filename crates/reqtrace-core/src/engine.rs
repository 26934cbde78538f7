//! The tracing-engine collaborator contract.
//!
//! The core never parses specification items or computes coverage itself; it
//! hands paths and tag configurations to a [`TracingEngine`] implementation
//! and reads back only the item and defect counts. The data types here are
//! the fixed wire contract between the pipeline and any engine.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{DetailsDisplay, FilterSettings, ReportFormat, ReportVerbosity};
use crate::error::Result;
use crate::snapshot::ResolvedTagConfig;

/// Identity of a specification item: artifact type, name and revision.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId {
    pub artifact_type: String,
    pub name: String,
    pub revision: u32,
}

impl ItemId {
    pub fn new(artifact_type: impl Into<String>, name: impl Into<String>, revision: u32) -> Self {
        Self {
            artifact_type: artifact_type.into(),
            name: name.into(),
            revision,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}~{}", self.artifact_type, self.name, self.revision)
    }
}

/// Where an item was found. `path` may address an archive entry using the
/// `<archive>!<entry>` convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub path: String,
    pub line: u32,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}

/// A single requirement/design/implementation/test artifact with its declared
/// coverage relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificationItem {
    pub id: ItemId,

    /// Items this item claims to cover.
    #[serde(default)]
    pub covers: Vec<ItemId>,

    /// Artifact types that must provide coverage for this item.
    #[serde(default)]
    pub needs: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An item after link resolution, annotated with its coverage violations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedSpecificationItem {
    pub item: SpecificationItem,

    /// Needed artifact types with no covering item.
    #[serde(default)]
    pub uncovered: Vec<String>,

    /// `covers` references that match no known item.
    #[serde(default)]
    pub orphaned_covers: Vec<ItemId>,
}

impl LinkedSpecificationItem {
    pub fn is_defect(&self) -> bool {
        !self.uncovered.is_empty() || !self.orphaned_covers.is_empty()
    }
}

/// Result of a full trace. The orchestrator reads only the two counts; the
/// linked items are carried for report rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceResult {
    pub linked: Vec<LinkedSpecificationItem>,
}

impl TraceResult {
    pub fn count(&self) -> usize {
        self.linked.len()
    }

    pub fn count_defects(&self) -> usize {
        self.linked.iter().filter(|l| l.is_defect()).count()
    }

    pub fn has_defects(&self) -> bool {
        self.count_defects() > 0
    }
}

/// Inputs handed to [`TracingEngine::import_items`].
#[derive(Debug, Clone, Default)]
pub struct ImportSettings {
    /// Files and directories to import, in deterministic order.
    pub inputs: Vec<PathBuf>,

    /// Resolved tag-source configurations (pattern + metadata + frozen
    /// name prefix + pre-resolved paths).
    pub tag_configs: Vec<ResolvedTagConfig>,

    /// Item filter applied after import.
    pub filter: FilterSettings,
}

/// Report rendering settings handed to [`TracingEngine::report_to_path`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSettings {
    pub format: ReportFormat,
    pub verbosity: ReportVerbosity,
    pub details_display: DetailsDisplay,
}

/// External tracing engine consumed as a black box.
///
/// Implementations parse, link and trace specification items; the core only
/// orchestrates the calls and the file handoff between them.
#[async_trait]
pub trait TracingEngine: Send + Sync {
    /// Import specification items from the given sources.
    async fn import_items(&self, settings: &ImportSettings) -> Result<Vec<SpecificationItem>>;

    /// Export items to the canonical interchange file at `path`.
    ///
    /// The output must be byte-stable: identical items produce identical
    /// bytes (UTF-8, `\n` newlines).
    async fn export_to_path(&self, items: &[SpecificationItem], path: &Path) -> Result<()>;

    /// Establish coverage relations between items.
    fn link(&self, items: Vec<SpecificationItem>) -> Vec<LinkedSpecificationItem>;

    /// Compute the coverage trace over linked items.
    fn trace(&self, linked: Vec<LinkedSpecificationItem>) -> TraceResult;

    /// Render `trace` to `path` in the requested format.
    async fn report_to_path(
        &self,
        trace: &TraceResult,
        path: &Path,
        settings: &ReportSettings,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_display() {
        let id = ItemId::new("dsn", "pattern-resolution", 2);
        assert_eq!(id.to_string(), "dsn~pattern-resolution~2");
    }

    #[test]
    fn test_origin_display_with_archive_entry() {
        let origin = Origin {
            path: "requirements-1.0.zip!spec.md".to_string(),
            line: 2,
        };
        assert_eq!(origin.to_string(), "requirements-1.0.zip!spec.md:2");
    }

    #[test]
    fn test_trace_result_counts() {
        let covered = LinkedSpecificationItem {
            item: SpecificationItem {
                id: ItemId::new("dsn", "a", 1),
                covers: Vec::new(),
                needs: Vec::new(),
                tags: Vec::new(),
                origin: None,
                description: None,
            },
            uncovered: Vec::new(),
            orphaned_covers: Vec::new(),
        };
        let mut defect = covered.clone();
        defect.uncovered.push("utest".to_string());

        let trace = TraceResult {
            linked: vec![covered, defect],
        };
        assert_eq!(trace.count(), 2);
        assert_eq!(trace.count_defects(), 1);
        assert!(trace.has_defects());
    }
}
