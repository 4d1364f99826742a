#![deny(missing_docs)]

//! # Report Output
//!
//! Prints a [`PipelineReport`] as plain lines, HTML line breaks, or JSON.
//!
//! The text and HTML forms are exactly the report lines: per-schema lines first,
//! the compile summary last. Verification results only appear in the JSON form;
//! otherwise they are visible in the logs.

use crate::error::{CliError, CliResult};
use schemagen_core::PipelineReport;
use std::io::Write;

/// Output format of a report.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// One line per schema, then the compile summary.
    #[default]
    Text,
    /// The text lines joined with `<br />`.
    Html,
    /// The whole report, including diagnostics and verification.
    Json,
}

/// Writes `report` to `out` in `format`.
pub fn write_report(
    report: &PipelineReport,
    format: ReportFormat,
    out: &mut impl Write,
) -> CliResult<()> {
    match format {
        ReportFormat::Text => writeln!(out, "{}", report.render_text())?,
        ReportFormat::Html => writeln!(out, "{}", report.render_html())?,
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
            writeln!(out, "{}", json)?;
        }
    }
    Ok(())
}
