//! Logging setup
//!
//! Log lines go to stderr through `tracing`; the completion lines a run
//! prints are plain stdout and never filtered.

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Verbosity of the runner's own log output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `--verbose` adds container and command progress to the default
    /// warnings and failures
    pub fn for_verbosity(verbose: bool) -> Self {
        if verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        }
    }

    fn as_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Filter directive scoping the level to this crate only, so child
    /// libraries stay quiet
    pub fn directive(self) -> String {
        format!("{}={}", env!("CARGO_CRATE_NAME"), self)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!(
                "unknown log level '{other}' (expected trace, debug, info, warn or error)"
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = self.as_level().to_string().to_lowercase();
        f.write_str(&level)
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
pub fn init_logger(level: LogLevel) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}
