//! Configuration module
//!
//! Builds the immutable [`RunConfig`] from defaults, an optional config file,
//! `TEST_RUNNER_*` environment variables and command-line flags, in that order
//! of precedence.

mod env;
mod file;

pub use env::EnvConfig;
pub use file::ConfigFile;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::{RunnerError, RunnerResult};

/// What to do when a batch cannot get a working container
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartFailurePolicy {
    /// Cancel the remaining batches and fail the run
    #[default]
    Abort,
    /// Record the failure for that batch and let the others finish
    Isolate,
}

impl FromStr for StartFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(StartFailurePolicy::Abort),
            "isolate" => Ok(StartFailurePolicy::Isolate),
            other => Err(format!(
                "unknown start failure policy '{other}' (expected abort or isolate)"
            )),
        }
    }
}

impl fmt::Display for StartFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartFailurePolicy::Abort => write!(f, "abort"),
            StartFailurePolicy::Isolate => write!(f, "isolate"),
        }
    }
}

/// How a batch decides its container is ready for tests
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadinessMode {
    /// Sleep for a fixed warm-up period
    FixedDelay { secs: u64 },
    /// Poll `pg_isready` inside the container until it answers or times out
    Probe { timeout_secs: u64, interval_secs: u64 },
}

/// Container runtime and database settings shared by every batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSettings {
    /// Container runtime binary (docker, podman)
    pub runtime: String,

    /// Database image
    pub image: String,

    pub user: String,
    pub password: String,
    pub database: String,

    /// Port the database listens on inside the container
    pub container_port: u16,

    /// Host exported to the tests as POSTGRES_HOST
    pub host: String,

    /// Container names are `<prefix>_<batch index>`
    pub name_prefix: String,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            image: "postgres".to_string(),
            user: "test".to_string(),
            password: "test".to_string(),
            database: "testdb".to_string(),
            container_port: 5432,
            host: "localhost".to_string(),
            name_prefix: "postgres_test".to_string(),
        }
    }
}

/// Settings for one run. Built once and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Root directory scanned for test files
    pub root_path: PathBuf,

    /// Files per batch
    pub batch_size: usize,

    /// Command prefix; the file path is appended
    pub test_command: String,

    /// Batch `i` publishes its container on `base_port + i`
    pub base_port: u16,

    /// Shell glob matched against file base names
    pub file_pattern: String,

    pub verbose: bool,

    pub container: ContainerSettings,

    /// Warm-up delay when readiness probing is off
    pub warmup_secs: u64,

    /// Probe with `pg_isready` instead of sleeping
    pub wait_ready: bool,

    pub ready_timeout_secs: u64,
    pub ready_interval_secs: u64,

    pub start_failure: StartFailurePolicy,

    /// Exit non-zero when any batch failed
    pub strict: bool,

    /// Optional JSON/CSV report destination
    pub report: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("."),
            batch_size: 25,
            test_command: "go test".to_string(),
            base_port: 5433,
            file_pattern: "*_test.go".to_string(),
            verbose: false,
            container: ContainerSettings::default(),
            warmup_secs: 5,
            wait_ready: false,
            ready_timeout_secs: 60,
            ready_interval_secs: 1,
            start_failure: StartFailurePolicy::default(),
            strict: false,
            report: None,
        }
    }
}

impl RunConfig {
    /// Apply layers over the defaults; later layers win
    pub fn layered(layers: impl IntoIterator<Item = ConfigLayer>) -> Self {
        let mut config = Self::default();
        for layer in layers {
            config.apply(layer);
        }
        config
    }

    /// Overwrite every field the layer sets
    pub fn apply(&mut self, layer: ConfigLayer) {
        macro_rules! set {
            ($($field:ident => $target:expr),* $(,)?) => {
                $(if let Some(value) = layer.$field {
                    $target = value;
                })*
            };
        }

        set! {
            test_folder => self.root_path,
            block_size => self.batch_size,
            test_command => self.test_command,
            base_port => self.base_port,
            file_pattern => self.file_pattern,
            verbose => self.verbose,
            runtime => self.container.runtime,
            image => self.container.image,
            user => self.container.user,
            password => self.container.password,
            database => self.container.database,
            container_port => self.container.container_port,
            name_prefix => self.container.name_prefix,
            warmup_secs => self.warmup_secs,
            wait_ready => self.wait_ready,
            ready_timeout_secs => self.ready_timeout_secs,
            ready_interval_secs => self.ready_interval_secs,
            on_start_failure => self.start_failure,
            strict => self.strict,
        }

        if layer.report.is_some() {
            self.report = layer.report;
        }
    }

    /// Reject settings that cannot produce a meaningful run
    pub fn validate(&self) -> RunnerResult<()> {
        if self.batch_size == 0 {
            return Err(RunnerError::InvalidConfig(
                "block size must be at least 1".to_string(),
            ));
        }

        if self.test_command.trim().is_empty() {
            return Err(RunnerError::InvalidConfig(
                "test command must not be empty".to_string(),
            ));
        }

        if self.file_pattern.is_empty() {
            return Err(RunnerError::InvalidConfig(
                "file pattern must not be empty".to_string(),
            ));
        }

        if self.container.runtime.trim().is_empty() {
            return Err(RunnerError::InvalidConfig(
                "container runtime must not be empty".to_string(),
            ));
        }

        if self.base_port == u16::MAX {
            return Err(RunnerError::InvalidConfig(format!(
                "base port {} leaves no room for batch ports",
                self.base_port
            )));
        }

        if self.wait_ready && self.ready_interval_secs == 0 {
            return Err(RunnerError::InvalidConfig(
                "readiness probe interval must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }

    pub fn readiness(&self) -> ReadinessMode {
        if self.wait_ready {
            ReadinessMode::Probe {
                timeout_secs: self.ready_timeout_secs,
                interval_secs: self.ready_interval_secs,
            }
        } else {
            ReadinessMode::FixedDelay {
                secs: self.warmup_secs,
            }
        }
    }
}

/// A partial configuration from one source (file, environment or CLI)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub test_folder: Option<PathBuf>,
    pub block_size: Option<usize>,
    pub test_command: Option<String>,
    pub base_port: Option<u16>,
    pub file_pattern: Option<String>,
    pub verbose: Option<bool>,
    pub runtime: Option<String>,
    pub image: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub container_port: Option<u16>,
    pub name_prefix: Option<String>,
    pub warmup_secs: Option<u64>,
    pub wait_ready: Option<bool>,
    pub ready_timeout_secs: Option<u64>,
    pub ready_interval_secs: Option<u64>,
    pub on_start_failure: Option<StartFailurePolicy>,
    pub strict: Option<bool>,
    pub report: Option<PathBuf>,
}
