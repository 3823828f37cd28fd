//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Ingest
//!
//! ```text
//! Ingested My Post.md → _posts/2024-03-01-My Post.md
//!     Id: 1b4d4ddb-7620-477e-b1f9-8f3ce24574e4
//!     Front-matter: inserted
//!     Cover: /assets/img/blogs/0f7c2a31-….png (corrected)
//! Images expected: 3, actual: 2, failed: 1
//!     001 https://img.example/broken.png
//!         Reason: https://img.example/broken.png answered HTTP 404
//! READMEs
//!     README.md (en): list replaced
//!     README.zh_CN.md (zh_CN): unchanged
//! ```
//!
//! ## Sync
//!
//! ```text
//! Permalinks: 2 updated, 1 unchanged, 1 skipped
//!     001 a.md: updated
//!     002 d.md: skipped (no manifest record)
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::maintenance::MaintenanceReport;
use crate::pipeline::IngestReport;
use crate::readme::{ListChange, ReadmeOutcome, ReadmeStatus};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `path` relative to `root` when possible.
fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

// ============================================================================
// README outcomes
// ============================================================================

pub fn format_readme_outcomes(outcomes: &[ReadmeOutcome], depth: usize) -> Vec<String> {
    outcomes
        .iter()
        .map(|o| {
            let status = match &o.result {
                Ok(ReadmeStatus::Updated(ListChange::Replaced)) => "list replaced".to_string(),
                Ok(ReadmeStatus::Updated(ListChange::Inserted)) => "list inserted".to_string(),
                Ok(ReadmeStatus::Unchanged) => "unchanged".to_string(),
                Err(e) => format!("failed: {e}"),
            };
            format!(
                "{}{} ({}): {}",
                indent(depth),
                o.target.path,
                o.target.language,
                status
            )
        })
        .collect()
}

pub fn print_readme_outcomes(outcomes: &[ReadmeOutcome]) {
    println!("READMEs");
    for line in format_readme_outcomes(outcomes, 1) {
        println!("{}", line);
    }
}

// ============================================================================
// Ingest
// ============================================================================

/// The image summary line plus one entry per failed download.
pub fn format_image_summary(report: &IngestReport) -> Vec<String> {
    let images = &report.images;
    let mut lines = vec![format!(
        "Images expected: {}, actual: {}, failed: {}",
        images.expected.len(),
        images.stored.len(),
        images.failed.len()
    )];
    for (i, failed) in images.failed.iter().enumerate() {
        lines.push(format!("{}{} {}", indent(1), format_index(i + 1), failed.url));
        lines.push(format!("{}Reason: {}", indent(2), failed.reason));
    }
    lines
}

pub fn format_ingest_report(report: &IngestReport, root: &Path) -> Vec<String> {
    let source_name = report
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| report.source.display().to_string());
    let verb = if report.reingested {
        "Re-ingested"
    } else {
        "Ingested"
    };

    let mut lines = vec![
        format!(
            "{} {} → {}",
            verb,
            source_name,
            display_relative(&report.post_path, root)
        ),
        format!("{}Id: {}", indent(1), report.id),
        format!(
            "{}Front-matter: {}",
            indent(1),
            if report.synthesis.inserted {
                "inserted"
            } else {
                "kept existing"
            }
        ),
    ];
    if let Some(cover) = &report.synthesis.cover {
        let note = if report.images.corrected > 0 {
            " (corrected)"
        } else {
            ""
        };
        lines.push(format!("{}Cover: {}{}", indent(1), cover, note));
    }
    lines.extend(format_image_summary(report));
    lines.push("READMEs".to_string());
    lines.extend(format_readme_outcomes(&report.readme, 1));
    lines
}

pub fn print_ingest_report(report: &IngestReport, root: &Path) {
    for line in format_ingest_report(report, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Sync
// ============================================================================

pub fn format_maintenance_report(label: &str, report: &MaintenanceReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {} updated, {} unchanged, {} skipped",
        label,
        report.updated.len(),
        report.unchanged.len(),
        report.skipped.len()
    )];
    let details = report
        .updated
        .iter()
        .map(|name| format!("{name}: updated"))
        .chain(
            report
                .skipped
                .iter()
                .map(|(name, reason)| format!("{name}: skipped ({reason})")),
        );
    for (i, detail) in details.enumerate() {
        lines.push(format!("{}{} {}", indent(1), format_index(i + 1), detail));
    }
    lines
}

pub fn print_maintenance_report(label: &str, report: &MaintenanceReport) {
    for line in format_maintenance_report(label, report) {
        println!("{}", line);
    }
}
