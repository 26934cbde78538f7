//! Tag-source, filter and report configuration values.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::engine::SpecificationItem;
use crate::pattern::PathPattern;

/// One declared tag-source block: a path pattern over source files that carry
/// inline coverage tags, plus the artifact-type metadata the engine needs to
/// turn those tags into specification items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSourceConfig {
    pub pattern: PathPattern,

    /// Artifact type the tagged items cover (e.g. `dsn`).
    pub covered_artifact_type: String,

    /// Artifact type of the items created from tags (e.g. `impl`).
    pub tag_artifact_type: String,

    /// Prefix prepended to covered item names. When unset, the owning
    /// module's name plus a trailing dot is captured at snapshot time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covered_item_name_prefix: Option<String>,
}

/// A pure predicate over specification items.
///
/// An empty restriction set means "accept all" for that dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub artifact_types: BTreeSet<String>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default = "default_true")]
    pub accept_items_without_tag: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            artifact_types: BTreeSet::new(),
            tags: BTreeSet::new(),
            accept_items_without_tag: true,
        }
    }
}

impl FilterSettings {
    /// Whether any restriction is configured at all.
    pub fn is_unrestricted(&self) -> bool {
        self.artifact_types.is_empty() && self.tags.is_empty() && self.accept_items_without_tag
    }

    pub fn accepts(&self, item: &SpecificationItem) -> bool {
        if !self.artifact_types.is_empty() && !self.artifact_types.contains(&item.id.artifact_type)
        {
            return false;
        }
        if item.tags.is_empty() {
            return self.tags.is_empty() || self.accept_items_without_tag;
        }
        self.tags.is_empty() || item.tags.iter().any(|t| self.tags.contains(t))
    }
}

/// Output format of the human-facing report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Plain,
    Html,
    /// Interactive report; the viewer bundle is packaged alongside when
    /// available.
    Ux,
}

impl ReportFormat {
    /// Extension used when deriving the default report path.
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            _ => "txt",
        }
    }
}

/// How much detail the report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportVerbosity {
    Quiet,
    Minimal,
    Summary,
    Failures,
    #[default]
    FailureDetails,
    All,
}

/// Whether per-item detail sections start collapsed or expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetailsDisplay {
    #[default]
    Collapse,
    Expand,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ItemId;

    fn item(artifact_type: &str, tags: &[&str]) -> SpecificationItem {
        SpecificationItem {
            id: ItemId::new(artifact_type, "example", 1),
            covers: Vec::new(),
            needs: Vec::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            origin: None,
            description: None,
        }
    }

    #[test]
    fn test_default_filter_accepts_everything() {
        let filter = FilterSettings::default();
        assert!(filter.is_unrestricted());
        assert!(filter.accepts(&item("dsn", &[])));
        assert!(filter.accepts(&item("impl", &["tagged"])));
    }

    #[test]
    fn test_artifact_type_restriction() {
        let filter = FilterSettings {
            artifact_types: ["dsn".to_string()].into(),
            ..Default::default()
        };
        assert!(filter.accepts(&item("dsn", &[])));
        assert!(!filter.accepts(&item("impl", &[])));
    }

    #[test]
    fn test_tag_restriction_accepts_matching_tag() {
        let filter = FilterSettings {
            tags: ["safety".to_string()].into(),
            accept_items_without_tag: false,
            ..Default::default()
        };
        assert!(filter.accepts(&item("dsn", &["safety"])));
        assert!(!filter.accepts(&item("dsn", &["other"])));
        assert!(!filter.accepts(&item("dsn", &[])));
    }

    #[test]
    fn test_items_without_tag_accepted_when_configured() {
        let filter = FilterSettings {
            tags: ["safety".to_string()].into(),
            accept_items_without_tag: true,
            ..Default::default()
        };
        assert!(filter.accepts(&item("dsn", &[])));
    }

    #[test]
    fn test_report_format_extensions() {
        assert_eq!(ReportFormat::Plain.extension(), "txt");
        assert_eq!(ReportFormat::Html.extension(), "html");
        assert_eq!(ReportFormat::Ux.extension(), "txt");
    }
}
