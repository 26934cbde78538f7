//! Two-stage requirement-tracing pipeline: Collect exports a canonical
//! interchange artifact from the aggregated sources, Trace links it against
//! imported artifacts and renders a coverage report.

pub mod collect;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod trace;
pub mod uptodate;

pub use collect::CollectStage;
pub use error::{PipelineError, Result};
pub use pipeline::{PipelineSettings, TracePipeline};
pub use report::{DirResourceProvider, NoResources, ReportSink, ResourceHandle, ResourceProvider};
pub use trace::{PipelineOutcome, TraceSettings, TraceStage};
