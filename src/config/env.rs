//! Environment variable configuration
//!
//! Provides `TEST_RUNNER_*` environment variable overrides.

use std::env;
use std::path::PathBuf;

use super::ConfigLayer;

/// Environment variable prefix
const ENV_PREFIX: &str = "TEST_RUNNER";

/// Configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Root folder from TEST_RUNNER_FOLDER
    pub folder: Option<String>,
    /// Files per batch from TEST_RUNNER_BLOCK_SIZE
    pub block_size: Option<usize>,
    /// Test command from TEST_RUNNER_COMMAND
    pub command: Option<String>,
    /// Base port from TEST_RUNNER_BASE_PORT
    pub base_port: Option<u16>,
    /// File pattern from TEST_RUNNER_PATTERN
    pub pattern: Option<String>,
    /// Verbose from TEST_RUNNER_VERBOSE
    pub verbose: Option<bool>,
    /// Container runtime from TEST_RUNNER_RUNTIME
    pub runtime: Option<String>,
    /// Database image from TEST_RUNNER_IMAGE
    pub image: Option<String>,
    /// Warm-up delay from TEST_RUNNER_WARMUP
    pub warmup: Option<u64>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            folder: get_env("FOLDER"),
            block_size: get_env_parse("BLOCK_SIZE"),
            command: get_env("COMMAND"),
            base_port: get_env_parse("BASE_PORT"),
            pattern: get_env("PATTERN"),
            verbose: get_env_bool("VERBOSE"),
            runtime: get_env("RUNTIME"),
            image: get_env("IMAGE"),
            warmup: get_env_parse("WARMUP"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.folder.is_some()
            || self.block_size.is_some()
            || self.command.is_some()
            || self.base_port.is_some()
            || self.pattern.is_some()
            || self.verbose.is_some()
            || self.runtime.is_some()
            || self.image.is_some()
            || self.warmup.is_some()
    }

    pub fn into_layer(self) -> ConfigLayer {
        ConfigLayer {
            test_folder: self.folder.map(PathBuf::from),
            block_size: self.block_size,
            test_command: self.command,
            base_port: self.base_port,
            file_pattern: self.pattern,
            verbose: self.verbose,
            runtime: self.runtime,
            image: self.image,
            warmup_secs: self.warmup,
            ..Default::default()
        }
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Sets prefixed variables for a test and restores them on drop
#[cfg(test)]
pub(crate) struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl EnvGuard {
    pub(crate) fn set(vars: &[(&str, &str)]) -> Self {
        let previous = vars
            .iter()
            .map(|(name, value)| {
                let key = format!("{ENV_PREFIX}_{name}");
                let old = env::var(&key).ok();
                env::set_var(&key, value);
                (key, old)
            })
            .collect();

        Self { previous }
    }
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}
