//! Output formatting module
//!
//! Renders run summaries as a table, JSON or CSV.

mod formatter;

pub use formatter::{failure_summary, write_report, OutputFormat, ReportFormatter};
