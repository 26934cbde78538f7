//! Plain-text and HTML report rendering.

use std::fmt::Write as _;

use reqtrace_core::{
    DetailsDisplay, LinkedSpecificationItem, ReportSettings, ReportVerbosity, TraceResult,
};

/// Summary line in the plain report's format, e.g. `ok - 0 total` or
/// `not ok - 3 total, 1 defect`.
pub fn summary_line(trace: &TraceResult) -> String {
    let total = trace.count();
    let defects = trace.count_defects();
    if defects == 0 {
        format!("ok - {total} total")
    } else {
        let noun = if defects == 1 { "defect" } else { "defects" };
        format!("not ok - {total} total, {defects} {noun}")
    }
}

fn item_line(linked: &LinkedSpecificationItem) -> String {
    let marker = if linked.is_defect() { "not ok" } else { "ok" };
    let mut line = format!("{marker} - {}", linked.item.id);
    if !linked.uncovered.is_empty() {
        let _ = write!(line, " (missing coverage: {})", linked.uncovered.join(", "));
    }
    if !linked.orphaned_covers.is_empty() {
        let orphans: Vec<String> = linked
            .orphaned_covers
            .iter()
            .map(|id| id.to_string())
            .collect();
        let _ = write!(line, " (orphaned covers: {})", orphans.join(", "));
    }
    if let Some(origin) = &linked.item.origin {
        let _ = write!(line, " at {origin}");
    }
    line
}

/// Render the plain-text report.
pub fn render_plain(trace: &TraceResult, verbosity: ReportVerbosity) -> String {
    let mut out = String::new();
    match verbosity {
        ReportVerbosity::Quiet => {}
        ReportVerbosity::Minimal => {
            out.push_str(if trace.has_defects() { "not ok" } else { "ok" });
            out.push('\n');
        }
        ReportVerbosity::Summary => {
            out.push_str(&summary_line(trace));
            out.push('\n');
        }
        ReportVerbosity::Failures => {
            for linked in trace.linked.iter().filter(|l| l.is_defect()) {
                let _ = writeln!(out, "not ok - {}", linked.item.id);
            }
            out.push_str(&summary_line(trace));
            out.push('\n');
        }
        ReportVerbosity::FailureDetails => {
            for linked in trace.linked.iter().filter(|l| l.is_defect()) {
                let _ = writeln!(out, "{}", item_line(linked));
            }
            out.push_str(&summary_line(trace));
            out.push('\n');
        }
        ReportVerbosity::All => {
            for linked in &trace.linked {
                let _ = writeln!(out, "{}", item_line(linked));
            }
            out.push_str(&summary_line(trace));
            out.push('\n');
        }
    }
    out
}

/// Render the HTML report.
pub fn render_html(trace: &TraceResult, settings: &ReportSettings) -> String {
    let open = match settings.details_display {
        DetailsDisplay::Expand => " open",
        DetailsDisplay::Collapse => "",
    };
    let mut items = String::new();
    for linked in &trace.linked {
        let _ = writeln!(
            items,
            "      <li class=\"{}\">{}</li>",
            if linked.is_defect() { "defect" } else { "covered" },
            html_escape(&item_line(linked))
        );
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"utf-8\">\n  \
         <title>Requirement tracing report</title>\n</head>\n<body>\n  \
         <h1>Requirement tracing report</h1>\n  <p class=\"summary\">{}</p>\n  \
         <details{open}>\n    <summary>Specification items</summary>\n    <ul>\n{}    </ul>\n  \
         </details>\n</body>\n</html>\n",
        html_escape(&summary_line(trace)),
        items
    )
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
