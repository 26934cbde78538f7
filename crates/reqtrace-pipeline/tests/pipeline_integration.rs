//! End-to-end pipeline tests driving the reference engine over real files.

use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use reqtrace_core::{
    AggregatedSources, FilterSettings, LocalRepositoryResolver, ModuleSources, PathPattern,
    ProjectAggregator, ReportVerbosity, TagConfigSnapshot, TagSourceConfig,
};
use reqtrace_engine::ReferenceEngine;
use reqtrace_pipeline::{
    CollectStage, PipelineError, PipelineSettings, ReportSink, TracePipeline,
};

fn pipeline() -> TracePipeline {
    TracePipeline::new(
        Arc::new(ReferenceEngine::new()),
        ReportSink::without_resources(),
    )
}

/// A project with one design item requiring impl and utest coverage, and a
/// source file providing only the impl tag. Traces to two items, one defect.
fn project_with_missing_utest(root: &Path) -> AggregatedSources {
    let reqs = root.join("reqs");
    fs::create_dir_all(&reqs).unwrap();
    fs::write(
        reqs.join("design.json"),
        r#"[{"id":{"artifact_type":"dsn","name":"feature","revision":1},"needs":["impl","utest"]}]"#,
    )
    .unwrap();

    let src = root.join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("feature.rs"), "// [impl->dsn~feature~1]\n").unwrap();

    let mut sources = AggregatedSources::default();
    sources.input_directories.insert(reqs);
    sources.input_directories.insert(src);
    sources
}

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

#[tokio::test]
async fn test_empty_project_traces_clean() {
    let build = tempdir().expect("tempdir");
    let settings = PipelineSettings::new(build.path());

    let outcome = pipeline()
        .run(&AggregatedSources::default(), &settings)
        .await
        .expect("pipeline run");

    assert_eq!(outcome.defect_count, 0);
    assert!(!outcome.build_should_fail);
    let report = fs::read_to_string(&outcome.report_path).unwrap();
    assert_eq!(report, "ok - 0 total\n");
}

#[tokio::test]
async fn test_missing_coverage_fails_the_build() {
    let project = tempdir().expect("tempdir");
    let build = tempdir().expect("tempdir");
    let sources = project_with_missing_utest(project.path());
    let settings = PipelineSettings::new(build.path());

    let err = pipeline().run(&sources, &settings).await.unwrap_err();
    let (count, report) = match err {
        PipelineError::DefectsFound { count, report } => (count, report),
        other => panic!("expected DefectsFound, got {other}"),
    };
    assert_eq!(count, 1);

    // The report is written before the build is failed.
    let text = fs::read_to_string(&report).unwrap();
    assert!(text.contains("missing coverage: utest"));
    assert!(text.ends_with("not ok - 2 total, 1 defect\n"));
}

#[tokio::test]
async fn test_defects_tolerated_when_fail_build_disabled() {
    let project = tempdir().expect("tempdir");
    let build = tempdir().expect("tempdir");
    let sources = project_with_missing_utest(project.path());
    let mut settings = PipelineSettings::new(build.path());
    settings.trace.fail_build = false;

    let outcome = pipeline().run(&sources, &settings).await.expect("run");
    assert_eq!(outcome.defect_count, 1);
    assert!(!outcome.build_should_fail);
    assert!(outcome.report_path.exists());
}

#[tokio::test]
async fn test_collect_output_is_byte_stable() {
    let project = tempdir().expect("tempdir");
    let build = tempdir().expect("tempdir");
    let sources = project_with_missing_utest(project.path());

    let stage = CollectStage::new(Arc::new(ReferenceEngine::new()));
    let first = build.path().join("first.json");
    let second = build.path().join("second.json");
    stage.run(&sources, &first).await.unwrap();
    stage.run(&sources, &second).await.unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[tokio::test]
async fn test_collect_skips_when_inputs_unchanged() {
    let project = tempdir().expect("tempdir");
    let build = tempdir().expect("tempdir");
    let sources = project_with_missing_utest(project.path());
    let output = build.path().join("items.json");

    let p = pipeline();
    p.run_collect(&sources, &output).await.unwrap();

    // Tampering with the output is only visible if the stage re-runs.
    fs::write(&output, "sentinel").unwrap();
    p.run_collect(&sources, &output).await.unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), "sentinel");

    // Changing an input invalidates the fingerprint and regenerates.
    fs::write(
        project.path().join("src/feature.rs"),
        "// [impl->dsn~feature~1]\n// [utest->dsn~feature~1]\n",
    )
    .unwrap();
    p.run_collect(&sources, &output).await.unwrap();
    assert_ne!(fs::read_to_string(&output).unwrap(), "sentinel");
}

#[tokio::test]
async fn test_trace_skip_reuses_stored_outcome() {
    let build = tempdir().expect("tempdir");
    let settings = PipelineSettings::new(build.path());
    let sources = AggregatedSources::default();

    let p = pipeline();
    let first = p.run(&sources, &settings).await.expect("first run");

    fs::write(&first.report_path, "sentinel").unwrap();
    let second = p.run(&sources, &settings).await.expect("second run");

    assert_eq!(second, first);
    assert_eq!(fs::read_to_string(&first.report_path).unwrap(), "sentinel");
}

#[tokio::test]
async fn test_flipping_fail_build_redecides_without_retrace() {
    let project = tempdir().expect("tempdir");
    let build = tempdir().expect("tempdir");
    let sources = project_with_missing_utest(project.path());
    let mut settings = PipelineSettings::new(build.path());
    settings.trace.fail_build = false;

    let p = pipeline();
    let outcome = p.run(&sources, &settings).await.expect("tolerant run");
    assert_eq!(outcome.defect_count, 1);

    // Mark the report so a re-trace would be detectable.
    fs::write(&outcome.report_path, "sentinel").unwrap();

    settings.trace.fail_build = true;
    let err = p.run(&sources, &settings).await.unwrap_err();
    assert!(matches!(err, PipelineError::DefectsFound { count: 1, .. }));
    assert_eq!(
        fs::read_to_string(&outcome.report_path).unwrap(),
        "sentinel"
    );
}

#[tokio::test]
async fn test_full_project_with_tag_sources_and_imported_archive() {
    let project = tempdir().expect("tempdir");
    let module_root = project.path().join("module-a");
    fs::create_dir_all(module_root.join("src")).unwrap();
    fs::write(module_root.join("src/Feature.java"), "// [[feature:1]]\n").unwrap();

    let reqs = module_root.join("reqs");
    fs::create_dir_all(&reqs).unwrap();
    fs::write(
        reqs.join("design.json"),
        r#"[{"id":{"artifact_type":"dsn","name":"module-a.feature","revision":1},"needs":["impl"]}]"#,
    )
    .unwrap();

    let repo = project.path().join("repo");
    fs::create_dir_all(&repo).unwrap();
    write_zip(
        &repo.join("requirements-1.0.zip"),
        &[("spec.md", "# external requirements\n[req->dsn~module-a.feature~1]\n")],
    );

    let snapshot = TagConfigSnapshot::capture(
        "module-a",
        &module_root,
        project.path(),
        &[TagSourceConfig {
            pattern: PathPattern::parse("glob:src/**/*.java"),
            covered_artifact_type: "dsn".to_string(),
            tag_artifact_type: "impl".to_string(),
            covered_item_name_prefix: None,
        }],
    )
    .expect("capture");

    let module = ModuleSources {
        name: "module-a".to_string(),
        root: module_root,
        input_directories: [reqs].into(),
        tag_snapshots: vec![snapshot],
        imported_requirements: vec!["requirements:1.0".to_string()],
        filter: FilterSettings::default(),
    };

    let aggregator = ProjectAggregator::new(Arc::new(LocalRepositoryResolver::new(repo.clone())));
    let sources = aggregator
        .aggregate(&[module], "module-a")
        .await
        .expect("aggregate");

    let build = tempdir().expect("tempdir");
    let mut settings = PipelineSettings::new(build.path());
    settings.trace.verbosity = ReportVerbosity::All;

    let outcome = pipeline().run(&sources, &settings).await.expect("run");
    assert_eq!(outcome.defect_count, 0);

    let report = fs::read_to_string(&outcome.report_path).unwrap();
    assert!(report.contains("ok - dsn~module-a.feature~1"));
    assert!(report.contains("requirements-1.0.zip!spec.md:2"));
    assert!(report.ends_with("ok - 3 total\n"));
}
