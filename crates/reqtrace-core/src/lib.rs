//! reqtrace core library
//!
//! Domain model and aggregation logic for requirement tracing across a
//! multi-module build:
//! - Path-pattern resolution (`glob:` / `regex:` / literal schemes)
//! - Immutable tag-source snapshots captured at the configuration boundary
//! - Cross-module source aggregation with deterministic ordering
//! - The `TracingEngine` and `ArtifactResolver` collaborator contracts

pub mod artifact;
pub mod config;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod snapshot;
pub mod sources;
pub mod telemetry;

pub use artifact::LocalRepositoryResolver;
pub use config::{DetailsDisplay, FilterSettings, ReportFormat, ReportVerbosity, TagSourceConfig};
pub use engine::{
    ImportSettings, ItemId, LinkedSpecificationItem, Origin, ReportSettings, SpecificationItem,
    TraceResult, TracingEngine,
};
pub use error::{Result, TraceError};
pub use pattern::{resolve_name_prefix, PathPattern, PatternScheme};
pub use snapshot::{ResolvedTagConfig, TagConfigSnapshot};
pub use sources::{AggregatedSources, ArtifactResolver, ModuleSources, ProjectAggregator};
pub use telemetry::init_tracing;
