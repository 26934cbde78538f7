//! Inline coverage-tag extraction from source files.
//!
//! Two tag syntaxes are recognized:
//! - Full tags, `[impl->dsn~validator~1]`, are self-describing: the tag
//!   artifact type and the covered item id are spelled out inline.
//! - Short tags, `[[checksum:2]]`, carry only a name and revision; the
//!   artifact types and name prefix come from the matching
//!   [`ResolvedTagConfig`].
//!
//! Each tag produces one specification item covering the referenced item.
//! Generated item names carry the line number so repeated tags stay unique
//! and imports stay deterministic.

use std::sync::OnceLock;

use regex::Regex;

use reqtrace_core::{ItemId, Origin, ResolvedTagConfig, SpecificationItem};

fn full_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(?P<type>[a-z][a-z0-9]*)->(?P<ctype>[a-z][a-z0-9]*)~(?P<name>[\w.-]+)~(?P<rev>\d+)\]")
            .expect("full tag regex")
    })
}

fn short_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[\[(?P<name>[\w.-]+):(?P<rev>\d+)\]\]").expect("short tag regex")
    })
}

/// Scan `content` for self-describing full tags.
///
/// `origin_path` may use the `<archive>!<entry>` convention for archive
/// entries.
pub fn scan_full_tags(content: &str, origin_path: &str) -> Vec<SpecificationItem> {
    let mut items = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        for captures in full_tag_regex().captures_iter(line) {
            let covered = ItemId::new(
                &captures["ctype"],
                &captures["name"],
                captures["rev"].parse().unwrap_or(0),
            );
            items.push(SpecificationItem {
                id: ItemId::new(
                    &captures["type"],
                    format!("{}-{line_no}", &captures["name"]),
                    0,
                ),
                covers: vec![covered],
                needs: Vec::new(),
                tags: Vec::new(),
                origin: Some(Origin {
                    path: origin_path.to_string(),
                    line: line_no,
                }),
                description: None,
            });
        }
    }
    items
}

/// Scan `content` for short tags interpreted through `config`.
///
/// The covered item name is the config's captured prefix plus the tag name,
/// concatenated exactly as configured.
pub fn scan_short_tags(
    content: &str,
    origin_path: &str,
    config: &ResolvedTagConfig,
) -> Vec<SpecificationItem> {
    let mut items = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        for captures in short_tag_regex().captures_iter(line) {
            let covered_name =
                format!("{}{}", config.covered_item_name_prefix, &captures["name"]);
            let covered = ItemId::new(
                &config.covered_artifact_type,
                covered_name.clone(),
                captures["rev"].parse().unwrap_or(0),
            );
            items.push(SpecificationItem {
                id: ItemId::new(
                    &config.tag_artifact_type,
                    format!("{covered_name}-{line_no}"),
                    0,
                ),
                covers: vec![covered],
                needs: Vec::new(),
                tags: Vec::new(),
                origin: Some(Origin {
                    path: origin_path.to_string(),
                    line: line_no,
                }),
                description: None,
            });
        }
    }
    items
}
