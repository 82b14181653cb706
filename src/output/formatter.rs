//! Output formatters for run summaries

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::models::{BatchReport, RunSummary};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" | "txt" | "text" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }

    /// Pick a format from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
            .unwrap_or(OutputFormat::Json)
    }
}

/// Summary formatter
pub struct ReportFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ReportFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(self.format_summary_table(summary)),
            OutputFormat::Json => {
                serde_json::to_string_pretty(summary).context("Failed to serialize summary")
            }
            OutputFormat::Csv => self.format_summary_csv(summary),
        }
    }

    fn format_batch_line(&self, report: &BatchReport) -> String {
        let status = if !self.colorize {
            report.outcome.label().to_string()
        } else if report.is_success() {
            format!("\x1b[32m{}\x1b[0m", report.outcome.label())
        } else {
            format!("\x1b[31m{}\x1b[0m", report.outcome.label())
        };

        let detail = report.outcome.detail();
        let mut line = format!(
            "  {:>3}  {:<20} {:>5}  {:>3}/{:<3} {:>8}ms  {}",
            report.index,
            report.container_name,
            report.port,
            report.files_run,
            report.files_total,
            report.duration_ms,
            status
        );
        if !detail.is_empty() {
            line.push_str(&format!("  {detail}"));
        }
        line
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "\n{} files in {} batches ({}ms)\n",
            summary.files_discovered,
            summary.batches.len(),
            summary.duration_ms()
        ));
        output.push_str("──────────────────────────────────────────────────────────────────────\n");
        output.push_str("  #    container             port  files        time  status\n");
        output.push_str("──────────────────────────────────────────────────────────────────────\n");

        for report in &summary.batches {
            output.push_str(&self.format_batch_line(report));
            output.push('\n');
        }

        output
    }

    fn format_summary_csv(&self, summary: &RunSummary) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer.write_record([
            "batch",
            "container",
            "port",
            "files_total",
            "files_run",
            "status",
            "detail",
            "duration_ms",
        ])?;

        for report in &summary.batches {
            writer.write_record([
                report.index.to_string(),
                report.container_name.clone(),
                report.port.to_string(),
                report.files_total.to_string(),
                report.files_run.to_string(),
                report.outcome.label().to_string(),
                report.outcome.detail(),
                report.duration_ms.to_string(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {e}"))?;
        String::from_utf8(bytes).context("CSV output is not valid UTF-8")
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// One line per batch that did not complete, empty when every batch did
pub fn failure_summary(summary: &RunSummary) -> String {
    let failed: Vec<&BatchReport> = summary.failed_batches().collect();
    if failed.is_empty() {
        return String::new();
    }

    let mut output = format!(
        "{} of {} batches failed:\n",
        failed.len(),
        summary.batches.len()
    );
    for report in failed {
        output.push_str(&format!("  {report}\n"));
    }
    output
}

/// Write the summary to `path`, formatted by its extension
pub fn write_report(path: &Path, summary: &RunSummary) -> Result<()> {
    let formatter = ReportFormatter::new(OutputFormat::from_path(path)).no_color();
    let content = formatter.format_summary(summary)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;

    info!("Wrote run report to {}", path.display());
    Ok(())
}
