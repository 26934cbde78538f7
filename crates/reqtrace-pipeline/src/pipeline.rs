//! End-to-end orchestration of the Collect and Trace stages with
//! up-to-date skipping per stage.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use reqtrace_core::{AggregatedSources, TracingEngine};

use crate::collect::{collect_inputs, CollectStage};
use crate::error::Result;
use crate::report::ReportSink;
use crate::trace::{PipelineOutcome, TraceSettings, TraceStage};
use crate::uptodate::{self, fingerprint};

/// Everything a full pipeline run needs besides the aggregated sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Destination of the Collect stage's interchange artifact.
    pub interchange_file: PathBuf,
    pub trace: TraceSettings,
}

impl PipelineSettings {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        let build_dir = build_dir.into();
        Self {
            interchange_file: build_dir.join("reqtrace").join("items.json"),
            trace: TraceSettings::new(build_dir),
        }
    }
}

/// Runs Collect then Trace, skipping a stage when its output is still
/// current for its inputs.
pub struct TracePipeline {
    engine: Arc<dyn TracingEngine>,
    sink: ReportSink,
}

impl TracePipeline {
    pub fn new(engine: Arc<dyn TracingEngine>, sink: ReportSink) -> Self {
        Self { engine, sink }
    }

    /// Run both stages and apply the fail-build decision.
    pub async fn run(
        &self,
        sources: &AggregatedSources,
        settings: &PipelineSettings,
    ) -> Result<PipelineOutcome> {
        self.run_collect(sources, &settings.interchange_file).await?;
        let outcome = self
            .run_trace(sources, &settings.interchange_file, &settings.trace)
            .await?;
        outcome.into_result()
    }

    /// Collect stage with incremental skip. The fingerprint covers the
    /// aggregated source description plus the contents of every input
    /// directory and tag file.
    pub async fn run_collect(&self, sources: &AggregatedSources, output: &Path) -> Result<()> {
        let digest = sources.digest()?;
        let inputs = collect_inputs(sources);
        let fp = fingerprint(&[digest.as_bytes()], &inputs)?;
        if uptodate::is_up_to_date(output, &fp) {
            info!(output = %output.display(), "collect output is up to date, skipping");
            return Ok(());
        }

        CollectStage::new(Arc::clone(&self.engine))
            .run(sources, output)
            .await?;
        uptodate::record(output, &fp)?;
        Ok(())
    }

    /// Trace stage with incremental skip. A skipped run reloads the stored
    /// outcome; the fail-build decision is re-applied against the current
    /// settings so flipping the flag does not require a re-trace.
    pub async fn run_trace(
        &self,
        sources: &AggregatedSources,
        interchange: &Path,
        settings: &TraceSettings,
    ) -> Result<PipelineOutcome> {
        let report_path = settings.report_path();
        let outcome_path = outcome_path(&report_path);

        let mut inputs = vec![interchange.to_path_buf()];
        inputs.extend(sources.imported_artifacts.iter().cloned());
        // The fail-build flag is deliberately not part of the fingerprint:
        // flipping it re-decides against the stored outcome without a
        // re-trace.
        let settings_json = serde_json::to_vec(&settings.report_settings())?;
        let filter_json = serde_json::to_vec(&sources.filter)?;
        let fp = fingerprint(&[&settings_json, &filter_json], &inputs)?;

        if uptodate::is_up_to_date(&report_path, &fp) {
            if let Some(stored) = load_outcome(&outcome_path) {
                info!(report = %report_path.display(), "trace report is up to date, skipping");
                return Ok(PipelineOutcome {
                    build_should_fail: settings.fail_build && stored.defect_count > 0,
                    ..stored
                });
            }
        }

        let stage = TraceStage::new(Arc::clone(&self.engine), self.sink.clone());
        let outcome = stage.run(interchange, sources, settings).await?;
        store_outcome(&outcome_path, &outcome)?;
        uptodate::record(&report_path, &fp)?;
        Ok(outcome)
    }
}

fn outcome_path(report: &Path) -> PathBuf {
    let mut name = report
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    name.push_str(".outcome.json");
    report.with_file_name(name)
}

fn load_outcome(path: &Path) -> Option<PipelineOutcome> {
    let bytes = std::fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn store_outcome(path: &Path, outcome: &PipelineOutcome) -> Result<()> {
    std::fs::write(path, serde_json::to_vec_pretty(outcome)?)?;
    Ok(())
}
