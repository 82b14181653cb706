//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{ConfigLayer, StartFailurePolicy};
use crate::utils::LogLevel;

/// Parallel test runner with PostgreSQL containers
#[derive(Parser, Debug)]
#[command(name = "test-runner")]
#[command(version)]
#[command(about = "Parallel test runner with PostgreSQL containers")]
#[command(long_about = None)]
pub struct Args {
    /// Path to the folder containing test files [default: .]
    #[arg(short = 'f', long)]
    pub test_folder: Option<PathBuf>,

    /// Number of test files per PostgreSQL container [default: 25]
    #[arg(short = 'b', long)]
    pub block_size: Option<usize>,

    /// Command to execute each test file [default: "go test"]
    #[arg(short = 'c', long)]
    pub test_command: Option<String>,

    /// Base port for PostgreSQL containers; batch i uses base + i [default: 5433]
    #[arg(short = 'p', long)]
    pub base_port: Option<u16>,

    /// File pattern to match test files [default: *_test.go]
    #[arg(short = 'P', long)]
    pub file_pattern: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (YAML or JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Container runtime binary [default: docker]
    #[arg(long)]
    pub runtime: Option<String>,

    /// PostgreSQL image [default: postgres]
    #[arg(long)]
    pub image: Option<String>,

    /// Seconds to wait after starting a container [default: 5]
    #[arg(long)]
    pub warmup: Option<u64>,

    /// Poll pg_isready instead of waiting a fixed delay
    #[arg(long)]
    pub wait_ready: bool,

    /// Seconds to wait for pg_isready before giving up [default: 60]
    #[arg(long)]
    pub ready_timeout: Option<u64>,

    /// What a container start failure does to the run: abort or isolate [default: abort]
    #[arg(long)]
    pub on_start_failure: Option<StartFailurePolicy>,

    /// Exit with status 1 when any batch failed
    #[arg(long)]
    pub strict: bool,

    /// Write a run report (.json or .csv)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides --verbose
    #[arg(long)]
    pub log_level: Option<LogLevel>,

    /// Print the batch plan without starting containers
    #[arg(long)]
    pub dry_run: bool,
}

impl Args {
    /// Flags given on the command line, as the highest-precedence layer
    pub fn to_layer(&self) -> ConfigLayer {
        ConfigLayer {
            test_folder: self.test_folder.clone(),
            block_size: self.block_size,
            test_command: self.test_command.clone(),
            base_port: self.base_port,
            file_pattern: self.file_pattern.clone(),
            verbose: self.verbose.then_some(true),
            runtime: self.runtime.clone(),
            image: self.image.clone(),
            warmup_secs: self.warmup,
            wait_ready: self.wait_ready.then_some(true),
            ready_timeout_secs: self.ready_timeout,
            on_start_failure: self.on_start_failure,
            strict: self.strict.then_some(true),
            report: self.report.clone(),
            ..Default::default()
        }
    }
}
