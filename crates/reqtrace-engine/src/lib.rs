//! Reference implementation of the reqtrace tracing-engine contract.
//!
//! Implements [`TracingEngine`] over:
//! - interchange JSON files (the Collect stage's canonical output),
//! - zip archives of requirement artifacts, addressed per entry with the
//!   `<archive>!<entry>` path convention,
//! - inline coverage tags scanned out of source files.
//!
//! The pipeline never depends on this crate; it is wired in by the CLI and
//! by integration tests through the trait object seam.

pub mod interchange;
pub mod linker;
pub mod render;
pub mod tag_scanner;

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use reqtrace_core::{
    ImportSettings, LinkedSpecificationItem, Origin, ReportFormat, ReportSettings, Result,
    SpecificationItem, TraceError, TraceResult, TracingEngine,
};

/// The built-in tracing engine.
#[derive(Debug, Default)]
pub struct ReferenceEngine;

impl ReferenceEngine {
    pub fn new() -> Self {
        Self
    }

    fn import_file(
        &self,
        path: &Path,
        settings: &ImportSettings,
        items: &mut Vec<SpecificationItem>,
    ) -> Result<()> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                let mut imported = interchange::read_items(path)?;
                debug!(path = %path.display(), items = imported.len(), "imported interchange file");
                items.append(&mut imported);
            }
            Some("zip") => {
                let mut imported = import_archive(path)?;
                debug!(path = %path.display(), items = imported.len(), "imported archive");
                items.append(&mut imported);
            }
            _ => {
                let content = match std::fs::read_to_string(path) {
                    Ok(content) => content,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable source file");
                        return Ok(());
                    }
                };
                let origin_path = path.to_string_lossy().into_owned();
                for config in &settings.tag_configs {
                    if config.paths.iter().any(|p| p == path) {
                        items.append(&mut tag_scanner::scan_short_tags(
                            &content,
                            &origin_path,
                            config,
                        ));
                    }
                }
                items.append(&mut tag_scanner::scan_full_tags(&content, &origin_path));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TracingEngine for ReferenceEngine {
    async fn import_items(&self, settings: &ImportSettings) -> Result<Vec<SpecificationItem>> {
        let mut items = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for input in &settings.inputs {
            if input.is_dir() {
                for entry in WalkDir::new(input)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|e| e.ok())
                {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    if seen.insert(entry.path().to_path_buf()) {
                        self.import_file(entry.path(), settings, &mut items)?;
                    }
                }
            } else if seen.insert(input.clone()) {
                self.import_file(input, settings, &mut items)?;
            }
        }

        let before = items.len();
        items.retain(|item| settings.filter.accepts(item));
        if items.len() != before {
            debug!(
                filtered = before - items.len(),
                remaining = items.len(),
                "applied item filters"
            );
        }
        info!(items = items.len(), inputs = settings.inputs.len(), "import finished");
        Ok(items)
    }

    async fn export_to_path(&self, items: &[SpecificationItem], path: &Path) -> Result<()> {
        interchange::write_items(items, path)
    }

    fn link(&self, items: Vec<SpecificationItem>) -> Vec<LinkedSpecificationItem> {
        linker::link(items)
    }

    fn trace(&self, linked: Vec<LinkedSpecificationItem>) -> TraceResult {
        linker::trace(linked)
    }

    async fn report_to_path(
        &self,
        trace: &TraceResult,
        path: &Path,
        settings: &ReportSettings,
    ) -> Result<()> {
        let rendered = match settings.format {
            ReportFormat::Plain => render::render_plain(trace, settings.verbosity),
            // The interactive format shares the HTML rendering; the viewer
            // bundle is packaged by the report sink, not here.
            ReportFormat::Html | ReportFormat::Ux => render::render_html(trace, settings),
        };
        std::fs::write(path, rendered.as_bytes())?;
        Ok(())
    }
}

/// Import every entry of a zip artifact.
///
/// Entry origins use the `<archive>!<entry>:<line>` convention so coverage
/// references in reports point into the archive.
fn import_archive(path: &Path) -> Result<Vec<SpecificationItem>> {
    let archive_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| TraceError::Engine(format!("cannot open archive {}: {e}", path.display())))?;

    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();

    let mut items = Vec::new();
    for name in names {
        let mut entry = archive
            .by_name(&name)
            .map_err(|e| TraceError::Engine(format!("cannot read {archive_name}!{name}: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        let mut content = String::new();
        if entry.read_to_string(&mut content).is_err() {
            warn!(entry = %name, archive = %archive_name, "skipping non-text archive entry");
            continue;
        }
        let entry_origin = format!("{archive_name}!{name}");

        if name.ends_with(".json") {
            let mut imported: Vec<SpecificationItem> = serde_json::from_str(&content)
                .map_err(|e| TraceError::Engine(format!("malformed entry {entry_origin}: {e}")))?;
            for item in &mut imported {
                let line = item.origin.as_ref().map(|o| o.line).unwrap_or(1);
                item.origin = Some(Origin {
                    path: entry_origin.clone(),
                    line,
                });
            }
            items.append(&mut imported);
        } else {
            items.append(&mut tag_scanner::scan_full_tags(&content, &entry_origin));
        }
    }
    Ok(items)
}
