//! Error types for the pipeline layer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the collect/trace pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The output directory could not be created; a fatal configuration
    /// error, never retried.
    #[error("error creating directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Coverage defects were found and the fail-build flag is set.
    #[error(
        "requirement tracing found {count} defect{}, see the report at {}",
        if *count == 1 { "" } else { "s" },
        report.display()
    )]
    DefectsFound { count: usize, report: PathBuf },

    /// Bubbled-up core error (pattern resolution, aggregation, engine).
    #[error(transparent)]
    Core(#[from] reqtrace_core::TraceError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;
