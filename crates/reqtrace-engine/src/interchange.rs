//! Canonical interchange format: a sorted JSON list of specification items.
//!
//! The Collect stage's output must be byte-stable so the host build cache can
//! key on it: items are sorted by id, encoded as pretty-printed UTF-8 JSON
//! with `\n` newlines and a single trailing newline.

use std::path::Path;

use reqtrace_core::{Result, SpecificationItem, TraceError};

/// Read an interchange file.
pub fn read_items(path: &Path) -> Result<Vec<SpecificationItem>> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        TraceError::Engine(format!(
            "malformed interchange file {}: {e}",
            path.display()
        ))
    })
}

/// Write `items` to `path` in canonical form.
pub fn write_items(items: &[SpecificationItem], path: &Path) -> Result<()> {
    let mut sorted: Vec<&SpecificationItem> = items.iter().collect();
    // Secondary key keeps exports deterministic when the same id appears at
    // several locations.
    sorted.sort_by_key(|i| {
        (
            i.id.clone(),
            i.origin.as_ref().map(|o| (o.path.clone(), o.line)),
        )
    });

    let mut encoded = serde_json::to_string_pretty(&sorted)?;
    encoded.push('\n');
    std::fs::write(path, encoded.as_bytes())?;
    Ok(())
}
