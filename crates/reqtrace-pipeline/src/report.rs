//! Report writing and auxiliary resource packaging.
//!
//! [`ReportSink`] owns the destination side of the Trace stage: it creates
//! the destination directory, lets the engine render into a scratch file and
//! persists it in one step, so an engine failure leaves either nothing or the
//! previous run's report, never a truncated file. For the interactive format
//! it also copies the viewer bundle next to the report when a
//! [`ResourceProvider`] can supply one; absence is logged and non-fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use reqtrace_core::{ReportFormat, ReportSettings, TraceResult, TracingEngine};

use crate::error::{PipelineError, Result};

/// A resolvable auxiliary resource (the interactive report's viewer bundle).
#[derive(Debug, Clone)]
pub struct ResourceHandle {
    /// File name the resource is packaged under, next to the report.
    pub name: String,
    pub path: PathBuf,
}

/// Supplies optional auxiliary resources for report packaging.
///
/// Absence is a first-class, testable branch: implementations return `None`
/// rather than failing when the resource cannot be located.
pub trait ResourceProvider: Send + Sync {
    fn viewer_bundle(&self) -> Option<ResourceHandle>;
}

/// Provider for installations without any bundled resources.
pub struct NoResources;

impl ResourceProvider for NoResources {
    fn viewer_bundle(&self) -> Option<ResourceHandle> {
        None
    }
}

/// Looks the viewer bundle up in a resources directory.
pub struct DirResourceProvider {
    dir: PathBuf,
    bundle_name: String,
}

impl DirResourceProvider {
    pub fn new(dir: impl Into<PathBuf>, bundle_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            bundle_name: bundle_name.into(),
        }
    }
}

impl ResourceProvider for DirResourceProvider {
    fn viewer_bundle(&self) -> Option<ResourceHandle> {
        let path = self.dir.join(&self.bundle_name);
        path.is_file().then(|| ResourceHandle {
            name: self.bundle_name.clone(),
            path,
        })
    }
}

/// Writes trace results to their destination.
#[derive(Clone)]
pub struct ReportSink {
    provider: Arc<dyn ResourceProvider>,
}

impl ReportSink {
    pub fn new(provider: Arc<dyn ResourceProvider>) -> Self {
        Self { provider }
    }

    /// Sink with no auxiliary resources available.
    pub fn without_resources() -> Self {
        Self::new(Arc::new(NoResources))
    }

    /// Render `trace` to `dest`, overwriting any existing file.
    pub async fn write(
        &self,
        engine: &dyn TracingEngine,
        trace: &TraceResult,
        dest: &Path,
        settings: &ReportSettings,
    ) -> Result<()> {
        ensure_parent_dir(dest)?;

        let scratch = scratch_path(dest);
        if let Err(e) = engine.report_to_path(trace, &scratch, settings).await {
            let _ = std::fs::remove_file(&scratch);
            return Err(e.into());
        }
        std::fs::rename(&scratch, dest)?;
        debug!(report = %dest.display(), "report written");

        if settings.format == ReportFormat::Ux {
            self.package_viewer_bundle(dest)?;
        }
        Ok(())
    }

    fn package_viewer_bundle(&self, report: &Path) -> Result<()> {
        match self.provider.viewer_bundle() {
            Some(handle) => {
                let target = report
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(&handle.name);
                std::fs::copy(&handle.path, &target)?;
                info!(bundle = %target.display(), "packaged interactive viewer bundle");
            }
            None => {
                info!("interactive viewer bundle not available, report written without it");
            }
        }
        Ok(())
    }
}

fn scratch_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    dest.with_file_name(name)
}

/// Create the parent directory of `path`. Failure is a fatal configuration
/// error.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| PipelineError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}
