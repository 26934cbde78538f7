//! Error types for the reqtrace core layer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by pattern resolution, snapshot capture and aggregation.
#[derive(Debug, Error)]
pub enum TraceError {
    /// A path pattern could not be compiled into a matcher.
    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A required output directory could not be created.
    #[error("error creating directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An imported-requirement coordinate could not be resolved to artifacts.
    #[error("cannot resolve imported requirements '{coordinate}': {detail}")]
    ArtifactResolution { coordinate: String, detail: String },

    /// Bubbled-up failure from the tracing engine.
    #[error("tracing engine error: {0}")]
    Engine(String),

    /// An I/O failure while reading sources or writing artifacts.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A serialization failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, TraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_error_displays_pattern_and_reason() {
        let err = TraceError::InvalidPattern {
            pattern: "regex:[".to_string(),
            reason: "unclosed character class".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("regex:["));
        assert!(msg.contains("unclosed"));
    }

    #[test]
    fn test_artifact_resolution_error_displays_coordinate() {
        let err = TraceError::ArtifactResolution {
            coordinate: "requirements:1.0".to_string(),
            detail: "no matching artifact in repository".to_string(),
        };
        assert!(err.to_string().contains("requirements:1.0"));
    }
}
