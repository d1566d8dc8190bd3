//! Report rendering
//!
//! The report is the only thing written to stdout. Diagnostics go through
//! [`crate::logging::Logger`] on stderr.

use crate::error::{RegmanError, Result};
use crate::scan::Report;
use std::io::{self, Write};

/// JSON layout of the printed report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

/// Serialize the report followed by a newline
pub fn write_report<W: Write>(writer: &mut W, report: &Report, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(report)?,
        OutputFormat::Compact => serde_json::to_string(report)?,
    };
    writeln!(writer, "{}", rendered)
        .and_then(|_| writer.flush())
        .map_err(|e| RegmanError::Output(format!("Failed to write report: {}", e)))
}

/// Print the report to stdout
pub fn print_report(report: &Report, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_report(&mut handle, report, format)
}
