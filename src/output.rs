//! CLI output formatting for job reports.
//!
//! Output leads with the job's identity (name and crop type) and what
//! happened to its original; each variant follows as an indented context
//! line with its status and the path relative to the images folder.
//!
//! ```text
//! a (hero) fetched
//!     300_200: written → images/300_200/a-hero.jpg
//!     1200_400: cached → images/1200_400/a-hero.jpg
//! ```
//!
//! Each `format_*` function returns `Vec<String>` for testability and has a
//! `print_*` wrapper that writes to stdout. Format functions do no I/O.

use crate::layout::StorageLayout;
use crate::variants::{VariantResult, VariantStatus};
use crate::worker::JobReport;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn status_label(status: VariantStatus) -> &'static str {
    match status {
        VariantStatus::Written => "written",
        VariantStatus::Cached => "cached",
    }
}

fn variant_line(variant: &VariantResult, layout: &StorageLayout) -> String {
    let shown = Path::new(layout.images_folder.file_name().unwrap_or_default())
        .join(layout.relative_variant(&variant.path));
    format!(
        "{}{}: {} → {}",
        indent(1),
        variant.format,
        status_label(variant.status),
        shown.display()
    )
}

/// Format one job report.
pub fn format_job_report(report: &JobReport, layout: &StorageLayout) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}) {}",
        report.job.name, report.job.crop_type, report.outcome
    )];
    lines.extend(report.variants.iter().map(|v| variant_line(v, layout)));
    lines
}

/// Format a job that failed; `label` identifies the input (file or line).
pub fn format_job_failure(label: &str, error: &dyn std::error::Error) -> Vec<String> {
    let mut lines = vec![format!("{label} failed: {error}")];
    let mut cause = error.source();
    while let Some(err) = cause {
        lines.push(format!("{}caused by: {err}", indent(1)));
        cause = err.source();
    }
    lines
}

/// Print a job report to stdout.
pub fn print_job_report(report: &JobReport, layout: &StorageLayout) {
    for line in format_job_report(report, layout) {
        println!("{}", line);
    }
}

/// Print a failed job to stderr.
pub fn print_job_failure(label: &str, error: &dyn std::error::Error) {
    for line in format_job_failure(label, error) {
        eprintln!("{}", line);
    }
}
