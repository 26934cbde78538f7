//! TOML project manifest.
//!
//! The manifest declares the participating modules, their tag sources and
//! imported requirements, plus report and repository settings. Loading it
//! captures each module's tag-source snapshot immediately, so everything
//! downstream works on frozen values.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use reqtrace_core::{
    DetailsDisplay, FilterSettings, ModuleSources, PathPattern, ReportFormat, ReportVerbosity,
    TagConfigSnapshot, TagSourceConfig,
};
use reqtrace_pipeline::{
    DirResourceProvider, NoResources, PipelineSettings, ReportSink, ResourceProvider,
};

/// Bundle file name used when the manifest does not override it.
const DEFAULT_VIEWER_BUNDLE: &str = "tracing-report-viewer.zip";

/// Raw manifest as written on disk.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Manifest {
    pub project: ProjectSection,

    #[serde(default)]
    pub report: ReportSection,

    pub repository: Option<RepositorySection>,

    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectSection {
    /// Module whose filter settings apply project-wide. Defaults to the
    /// first declared module.
    pub root_module: Option<String>,

    /// Build output directory, relative to the manifest. Defaults to `build`.
    pub build_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ReportSection {
    /// Explicit report path, relative to the manifest.
    pub file: Option<PathBuf>,

    #[serde(default)]
    pub format: ReportFormat,

    #[serde(default)]
    pub verbosity: ReportVerbosity,

    #[serde(default)]
    pub details: DetailsDisplay,

    /// Whether coverage defects fail the build. Defaults to `true`.
    pub fail_build: Option<bool>,

    /// Directory holding auxiliary report resources (the interactive
    /// viewer bundle), relative to the manifest.
    pub resources_dir: Option<PathBuf>,

    /// File name of the viewer bundle inside the resources directory.
    pub viewer_bundle: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RepositorySection {
    /// Flat directory of requirement artifacts, relative to the manifest.
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ModuleSection {
    pub name: String,

    /// Module root, relative to the manifest. Defaults to the module name.
    pub root: Option<PathBuf>,

    /// Specification input directories, relative to the module root.
    #[serde(default)]
    pub input_directories: Vec<PathBuf>,

    /// `name:version` coordinates resolved against the repository.
    #[serde(default)]
    pub imported_requirements: Vec<String>,

    #[serde(default, rename = "tag")]
    pub tags: Vec<TagSection>,

    pub filter: Option<FilterSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TagSection {
    /// `glob:`, `regex:` or literal path pattern over the module root.
    pub pattern: String,
    pub covered_type: String,
    pub tag_type: String,
    pub name_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilterSection {
    #[serde(default)]
    pub artifact_types: BTreeSet<String>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    pub accept_items_without_tag: Option<bool>,
}

impl FilterSection {
    fn into_settings(self) -> FilterSettings {
        FilterSettings {
            artifact_types: self.artifact_types,
            tags: self.tags,
            accept_items_without_tag: self.accept_items_without_tag.unwrap_or(true),
        }
    }
}

/// Fully resolved project: module sources with captured snapshots, the
/// repository location and the pipeline settings.
#[derive(Debug)]
pub struct Project {
    pub modules: Vec<ModuleSources>,
    pub root_module: String,
    pub repository: PathBuf,
    pub settings: PipelineSettings,
    pub resources_dir: Option<PathBuf>,
    pub viewer_bundle: String,
}

impl Project {
    /// Resource provider for report packaging: directory-backed when a
    /// resources directory is configured, otherwise empty.
    pub fn resource_provider(&self) -> Arc<dyn ResourceProvider> {
        match &self.resources_dir {
            Some(dir) => Arc::new(DirResourceProvider::new(
                dir.clone(),
                self.viewer_bundle.clone(),
            )),
            None => Arc::new(NoResources),
        }
    }

    pub fn report_sink(&self) -> ReportSink {
        ReportSink::new(self.resource_provider())
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Manifest> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read manifest {}", path.display()))?;
        let manifest: Manifest = toml::from_str(&text)
            .with_context(|| format!("malformed manifest {}", path.display()))?;
        if manifest.modules.is_empty() {
            bail!("manifest {} declares no modules", path.display());
        }
        Ok(manifest)
    }

    /// Resolve all paths against `manifest_dir` and capture tag snapshots.
    pub fn into_project(self, manifest_dir: &Path) -> Result<Project> {
        let Some(first) = self.modules.first() else {
            bail!("no modules declared");
        };
        let root_module = self.project.root_module.unwrap_or_else(|| first.name.clone());
        if !self.modules.iter().any(|m| m.name == root_module) {
            bail!("root module '{root_module}' is not declared in the manifest");
        }

        let build_dir = manifest_dir.join(
            self.project
                .build_dir
                .unwrap_or_else(|| PathBuf::from("build")),
        );
        let repository = manifest_dir.join(
            self.repository
                .map(|r| r.dir)
                .unwrap_or_else(|| PathBuf::from("repository")),
        );

        let mut modules = Vec::with_capacity(self.modules.len());
        for section in self.modules {
            let root = manifest_dir.join(section.root.unwrap_or_else(|| section.name.clone().into()));
            let tag_configs: Vec<TagSourceConfig> = section
                .tags
                .into_iter()
                .map(|tag| TagSourceConfig {
                    pattern: PathPattern::parse(&tag.pattern),
                    covered_artifact_type: tag.covered_type,
                    tag_artifact_type: tag.tag_type,
                    covered_item_name_prefix: tag.name_prefix,
                })
                .collect();
            let snapshot =
                TagConfigSnapshot::capture(&section.name, &root, manifest_dir, &tag_configs)
                    .with_context(|| format!("capturing tag sources of module '{}'", section.name))?;

            modules.push(ModuleSources {
                name: section.name,
                input_directories: section
                    .input_directories
                    .into_iter()
                    .map(|dir| root.join(dir))
                    .collect(),
                tag_snapshots: vec![snapshot],
                imported_requirements: section.imported_requirements,
                filter: section
                    .filter
                    .map(FilterSection::into_settings)
                    .unwrap_or_default(),
                root,
            });
        }

        let mut settings = PipelineSettings::new(&build_dir);
        settings.trace.report_file = self.report.file.map(|f| manifest_dir.join(f));
        settings.trace.format = self.report.format;
        settings.trace.verbosity = self.report.verbosity;
        settings.trace.details_display = self.report.details;
        settings.trace.fail_build = self.report.fail_build.unwrap_or(true);

        Ok(Project {
            modules,
            root_module,
            repository,
            settings,
            resources_dir: self.report.resources_dir.map(|d| manifest_dir.join(d)),
            viewer_bundle: self
                .report
                .viewer_bundle
                .unwrap_or_else(|| DEFAULT_VIEWER_BUNDLE.to_string()),
        })
    }
}
