//! Runner error taxonomy

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for runner operations
pub type RunnerResult<T> = std::result::Result<T, RunnerError>;

/// Errors raised while discovering, provisioning and running test batches
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to find test files under {}", .root.display())]
    Discovery {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Invalid file pattern '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to start container {name} on port {port}: {reason}")]
    ContainerStart {
        name: String,
        port: u16,
        reason: String,
    },

    #[error("Container {name} did not become ready: {reason}")]
    NotReady { name: String, reason: String },

    #[error("Test failed for file {}: {}", .file.display(), describe_exit(.exit_code))]
    TestCommand {
        file: PathBuf,
        exit_code: Option<i32>,
    },

    #[error("Failed to execute '{command}': {reason}")]
    CommandSpawn { command: String, reason: String },

    #[error("Failed to clean up container {name}: {reason}")]
    Cleanup { name: String, reason: String },
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit status {code}"),
        None => "no exit status".to_string(),
    }
}
