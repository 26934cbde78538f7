//! reqtrace - requirement tracing for multi-module builds
//!
//! ## Commands
//!
//! - `collect`: import specification items and export the interchange file
//! - `trace`: run the full pipeline and write the coverage report

mod manifest;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use reqtrace_core::{LocalRepositoryResolver, ProjectAggregator};
use reqtrace_engine::ReferenceEngine;
use reqtrace_pipeline::TracePipeline;

use manifest::{Manifest, Project};

#[derive(Parser)]
#[command(name = "reqtrace")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Requirement tracing for multi-module builds", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to the project manifest
    #[arg(short, long, global = true, default_value = "reqtrace.toml")]
    manifest: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import specification items and export the interchange file
    Collect {
        /// Override the interchange output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the full pipeline: collect, trace and report
    Trace {
        /// Override the report output path
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Tolerate coverage defects instead of failing
        #[arg(long)]
        no_fail: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    reqtrace_core::init_tracing(cli.json, level);

    let manifest_dir = cli
        .manifest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let project = Manifest::load(&cli.manifest)?.into_project(&manifest_dir)?;

    match cli.command {
        Commands::Collect { output } => cmd_collect(project, output).await,
        Commands::Trace { report, no_fail } => cmd_trace(project, report, no_fail).await,
    }
}

async fn aggregate(project: &Project) -> Result<reqtrace_core::AggregatedSources> {
    let resolver = Arc::new(LocalRepositoryResolver::new(project.repository.clone()));
    ProjectAggregator::new(resolver)
        .aggregate(&project.modules, &project.root_module)
        .await
        .context("aggregating module sources")
}

fn pipeline(project: &Project) -> TracePipeline {
    TracePipeline::new(Arc::new(ReferenceEngine::new()), project.report_sink())
}

async fn cmd_collect(project: Project, output: Option<PathBuf>) -> Result<()> {
    let sources = aggregate(&project).await?;
    let output = output.unwrap_or_else(|| project.settings.interchange_file.clone());

    pipeline(&project).run_collect(&sources, &output).await?;
    info!(output = %output.display(), "interchange file written");
    Ok(())
}

async fn cmd_trace(project: Project, report: Option<PathBuf>, no_fail: bool) -> Result<()> {
    let sources = aggregate(&project).await?;
    let pipeline = pipeline(&project);
    let mut settings = project.settings;
    if let Some(report) = report {
        settings.trace.report_file = Some(report);
    }
    if no_fail {
        settings.trace.fail_build = false;
    }

    let outcome = pipeline.run(&sources, &settings).await?;
    info!(
        report = %outcome.report_path.display(),
        defects = outcome.defect_count,
        "requirement tracing finished"
    );
    Ok(())
}
