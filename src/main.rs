//! test-runner - parallel test runner with per-batch PostgreSQL containers
//!
//! Discovers test files under a folder, splits them into fixed-size batches
//! and runs every batch concurrently against its own throwaway PostgreSQL
//! container. Files inside a batch run one after another; a failing file
//! stops the rest of its batch only.
//!
//! ## Usage
//!
//! ```bash
//! # Go tests, 25 files per container, ports 5434, 5435, ...
//! test-runner -f ./internal
//!
//! # pytest files, 10 per container, wait for pg_isready instead of sleeping
//! test-runner -f tests -P 'test_*.py' -c 'pytest -q' -b 10 --wait-ready
//!
//! # Show the batch plan only
//! test-runner -f ./internal --dry-run
//! ```
//!
//! Every test command sees `POSTGRES_HOST`, `POSTGRES_PORT`, `POSTGRES_USER`,
//! `POSTGRES_PASSWORD` and `POSTGRES_DB` for its batch's container.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod cli;
mod config;
mod container;
mod discovery;
mod executor;
mod models;
mod output;
mod utils;

use cli::Args;
use config::{ConfigFile, EnvConfig, RunConfig};
use models::RunSummary;
use executor::Orchestrator;
use output::{failure_summary, write_report, OutputFormat, ReportFormatter};
use utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            println!("{e:#}");
            std::process::exit(1);
        }
    }
}

/// Resolve configuration, run every batch and return the exit code
async fn run(args: Args) -> Result<i32> {
    let file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::load_default()?,
    };
    let env = EnvConfig::load();
    let env_overrides = env.has_any();

    let config = RunConfig::layered([file.into_layer(), env.into_layer(), args.to_layer()]);

    let level = args
        .log_level
        .unwrap_or_else(|| LogLevel::for_verbosity(config.verbose));
    init_logger(level)?;

    if env_overrides {
        debug!("Applied TEST_RUNNER_* environment overrides");
    }
    debug!("Resolved configuration: {:?}", config);

    let orchestrator = Orchestrator::new(config);

    if args.dry_run {
        print_plan(&orchestrator)?;
        return Ok(0);
    }

    let summary = orchestrator.run().await?;
    let config = orchestrator.config();

    if config.verbose {
        let table = ReportFormatter::new(OutputFormat::Table).format_summary(&summary)?;
        println!("{table}");
    }

    if let Some(path) = &config.report {
        write_report(path, &summary)?;
    }

    let failures = failure_summary(&summary);
    if !failures.is_empty() {
        print!("{failures}");
    }

    Ok(exit_code(config, &summary))
}

/// Failed batches only change the exit status under `--strict`
fn exit_code(config: &RunConfig, summary: &RunSummary) -> i32 {
    if config.strict && !summary.all_succeeded() {
        1
    } else {
        0
    }
}

fn print_plan(orchestrator: &Orchestrator) -> Result<()> {
    let batches = orchestrator.plan()?;
    let config = orchestrator.config();

    println!(
        "{} batches, image {} via {}",
        batches.len(),
        config.container.image,
        config.container.runtime
    );

    for batch in &batches {
        println!("\n{batch}");
        for file in &batch.files {
            println!("  {} {}", config.test_command, file.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::{Batch, BatchOutcome, BatchReport};
    use std::path::PathBuf;

    fn summary(outcome: BatchOutcome) -> RunSummary {
        let batch = Batch {
            index: 1,
            files: vec![PathBuf::from("a_test.go")],
            container_name: "postgres_test_1".to_string(),
            port: 5434,
        };
        RunSummary::new(
            Utc::now(),
            1,
            vec![BatchReport::pending(&batch).finish(outcome, 10)],
        )
    }

    #[test]
    fn test_failed_batches_exit_zero_by_default() {
        let failed = summary(BatchOutcome::TestFailed {
            file: PathBuf::from("a_test.go"),
            exit_code: Some(1),
        });
        assert_eq!(exit_code(&RunConfig::default(), &failed), 0);
    }

    #[test]
    fn test_strict_exit_code() {
        let strict = RunConfig {
            strict: true,
            ..Default::default()
        };

        let failed = summary(BatchOutcome::Cancelled);
        assert_eq!(exit_code(&strict, &failed), 1);

        let passed = summary(BatchOutcome::Completed);
        assert_eq!(exit_code(&strict, &passed), 0);
    }
}
