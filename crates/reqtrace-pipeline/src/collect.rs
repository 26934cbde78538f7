//! Collect stage: merge all specification sources into one interchange file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use reqtrace_core::{AggregatedSources, FilterSettings, ImportSettings, TracingEngine};

use crate::error::Result;
use crate::report::ensure_parent_dir;

/// First pipeline stage.
///
/// Imports specification items from the union of input directories and
/// pre-resolved tag files, then exports them to the canonical interchange
/// file. Filters are not applied here; the Trace stage owns filtering so the
/// interchange artifact always reflects the full declared source set.
pub struct CollectStage {
    engine: Arc<dyn TracingEngine>,
}

impl CollectStage {
    pub fn new(engine: Arc<dyn TracingEngine>) -> Self {
        Self { engine }
    }

    /// Run the stage, writing the interchange artifact to `output`.
    ///
    /// The output's parent directory is created if absent; failure to create
    /// it aborts the stage.
    pub async fn run(&self, sources: &AggregatedSources, output: &Path) -> Result<()> {
        ensure_parent_dir(output)?;

        for config in &sources.tag_configs {
            debug!(config = %config.describe(), "tag source configuration");
        }

        let settings = ImportSettings {
            inputs: collect_inputs(sources),
            tag_configs: sources.tag_configs.clone(),
            filter: FilterSettings::default(),
        };
        let items = self.engine.import_items(&settings).await?;
        self.engine.export_to_path(&items, output).await?;

        info!(
            items = items.len(),
            output = %output.display(),
            "collected specification items"
        );
        Ok(())
    }
}

/// The stage's full declared input set, in deterministic order.
pub(crate) fn collect_inputs(sources: &AggregatedSources) -> Vec<PathBuf> {
    let mut inputs: Vec<PathBuf> = sources.input_directories.iter().cloned().collect();
    inputs.extend(sources.tag_paths.iter().cloned());
    inputs
}
