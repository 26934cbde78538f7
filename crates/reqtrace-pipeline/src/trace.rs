//! Trace stage: import, link, trace and report, then decide pass/fail.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use reqtrace_core::{
    AggregatedSources, DetailsDisplay, ImportSettings, ReportFormat, ReportSettings,
    ReportVerbosity, TracingEngine,
};

use crate::error::{PipelineError, Result};
use crate::report::ReportSink;

/// Configuration of the Trace stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSettings {
    /// Explicit report destination; when unset the default path under the
    /// build directory is derived.
    pub report_file: Option<PathBuf>,

    pub format: ReportFormat,
    pub verbosity: ReportVerbosity,
    pub details_display: DetailsDisplay,

    /// Policy switch: whether coverage defects abort the build.
    pub fail_build: bool,

    /// Build output root, used for the default report path.
    pub build_dir: PathBuf,
}

impl TraceSettings {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_file: None,
            format: ReportFormat::default(),
            verbosity: ReportVerbosity::default(),
            details_display: DetailsDisplay::default(),
            fail_build: true,
            build_dir: build_dir.into(),
        }
    }

    /// Resolved report destination: the explicit path when configured,
    /// otherwise `<build_dir>/reports/tracing.<ext>`.
    pub fn report_path(&self) -> PathBuf {
        match &self.report_file {
            Some(path) => path.clone(),
            None => self
                .build_dir
                .join("reports")
                .join(format!("tracing.{}", self.format.extension())),
        }
    }

    pub(crate) fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            format: self.format,
            verbosity: self.verbosity,
            details_display: self.details_display,
        }
    }
}

/// Result of one Trace-stage run. Not persisted beyond the invocation except
/// as the up-to-date marker's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub report_path: PathBuf,
    pub defect_count: usize,
    pub build_should_fail: bool,
}

impl PipelineOutcome {
    /// Apply the fail-build decision: defects with the flag set become a
    /// stage failure naming the count and the report location.
    pub fn into_result(self) -> Result<PipelineOutcome> {
        if self.build_should_fail {
            Err(PipelineError::DefectsFound {
                count: self.defect_count,
                report: self.report_path,
            })
        } else {
            Ok(self)
        }
    }
}

/// Second pipeline stage.
pub struct TraceStage {
    engine: Arc<dyn TracingEngine>,
    sink: ReportSink,
}

impl TraceStage {
    pub fn new(engine: Arc<dyn TracingEngine>, sink: ReportSink) -> Self {
        Self { engine, sink }
    }

    /// Trace the interchange artifact plus directly imported artifacts and
    /// write the report.
    ///
    /// Coverage defects are a normal outcome, not an error: the returned
    /// outcome records whether the build should fail, and
    /// [`PipelineOutcome::into_result`] escalates it.
    pub async fn run(
        &self,
        interchange: &Path,
        sources: &AggregatedSources,
        settings: &TraceSettings,
    ) -> Result<PipelineOutcome> {
        let mut inputs = vec![interchange.to_path_buf()];
        inputs.extend(sources.imported_artifacts.iter().cloned());

        let import = ImportSettings {
            inputs,
            tag_configs: Vec::new(),
            filter: sources.filter.clone(),
        };
        let items = self.engine.import_items(&import).await?;
        let linked = self.engine.link(items);
        let trace = self.engine.trace(linked);

        let report_path = settings.report_path();
        self.sink
            .write(self.engine.as_ref(), &trace, &report_path, &settings.report_settings())
            .await?;

        let defect_count = trace.count_defects();
        if defect_count == 0 {
            info!(total = trace.count(), report = %report_path.display(), "requirement tracing clean");
        } else if !settings.fail_build {
            warn!(
                defects = defect_count,
                report = %report_path.display(),
                "requirement tracing found coverage defects"
            );
        }

        Ok(PipelineOutcome {
            report_path,
            defect_count,
            build_should_fail: settings.fail_build && defect_count > 0,
        })
    }
}
