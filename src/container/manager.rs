//! Container runtime commands
//!
//! Containers are identified only by name; the runtime owns their state.

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ContainerSettings;
use crate::models::{RunnerError, RunnerResult};

/// A started container owned by one batch.
///
/// Not `Clone`: [`ContainerManager::cleanup`] consumes it, so a handle is
/// released at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct ContainerHandle {
    name: String,
    port: u16,
}

impl ContainerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Drives the container runtime for database containers
#[derive(Clone, Debug)]
pub struct ContainerManager {
    settings: ContainerSettings,
}

impl ContainerManager {
    pub fn new(settings: ContainerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    /// Arguments for `<runtime> run`
    pub fn run_args(&self, name: &str, port: u16) -> Vec<String> {
        let s = &self.settings;
        vec![
            "run".to_string(),
            "--name".to_string(),
            name.to_string(),
            "-e".to_string(),
            format!("POSTGRES_USER={}", s.user),
            "-e".to_string(),
            format!("POSTGRES_PASSWORD={}", s.password),
            "-e".to_string(),
            format!("POSTGRES_DB={}", s.database),
            "-p".to_string(),
            format!("{}:{}", port, s.container_port),
            "-d".to_string(),
            s.image.clone(),
        ]
    }

    /// Connection variables exported to every test command of a batch
    pub fn connection_env(&self, port: u16) -> Vec<(&'static str, String)> {
        let s = &self.settings;
        vec![
            ("POSTGRES_HOST", s.host.clone()),
            ("POSTGRES_PORT", port.to_string()),
            ("POSTGRES_USER", s.user.clone()),
            ("POSTGRES_PASSWORD", s.password.clone()),
            ("POSTGRES_DB", s.database.clone()),
        ]
    }

    /// Launch a fresh container named `name` published on host `port`
    pub async fn start(&self, name: &str, port: u16) -> RunnerResult<ContainerHandle> {
        let args = self.run_args(name, port);
        info!(
            "Starting PostgreSQL container with command: {} {}",
            self.settings.runtime,
            args.join(" ")
        );

        let output = Command::new(&self.settings.runtime)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RunnerError::ContainerStart {
                name: name.to_string(),
                port,
                reason: format!("failed to execute {}: {e}", self.settings.runtime),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => format!("{} run exited with {}", self.settings.runtime, output.status),
                msg => msg.to_string(),
            };
            return Err(RunnerError::ContainerStart {
                name: name.to_string(),
                port,
                reason,
            });
        }

        let id = String::from_utf8_lossy(&output.stdout);
        debug!("Container {} started ({})", name, id.trim());

        Ok(ContainerHandle {
            name: name.to_string(),
            port,
        })
    }

    /// Stop and remove a started container
    pub async fn cleanup(&self, handle: ContainerHandle) {
        self.remove(&handle.name).await;
    }

    /// Best-effort stop and force-remove by name. Failures are logged only.
    pub async fn remove(&self, name: &str) {
        info!("Stopping and removing container: {}", name);

        for args in [vec!["stop", name], vec!["rm", "-f", name]] {
            let cleanup = |reason: String| RunnerError::Cleanup {
                name: name.to_string(),
                reason,
            };
            if let Err(e) = self.run_quiet(&args, cleanup).await {
                debug!("{}", e);
            }
        }
    }

    /// Run a runtime subcommand, discarding its output. `on_error` turns the
    /// failure reason into the caller's error.
    pub(crate) async fn run_quiet<F>(&self, args: &[&str], on_error: F) -> RunnerResult<()>
    where
        F: FnOnce(String) -> RunnerError,
    {
        let output = match Command::new(&self.settings.runtime)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return Err(on_error(format!(
                    "failed to execute {}: {e}",
                    self.settings.runtime
                )))
            }
        };

        if output.status.success() {
            Ok(())
        } else {
            Err(on_error(format!(
                "{} {} exited with {}: {}",
                self.settings.runtime,
                args.first().copied().unwrap_or_default(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let manager = ContainerManager::new(ContainerSettings::default());
        let args = manager.run_args("postgres_test_1", 5434);

        assert_eq!(
            args.join(" "),
            "run --name postgres_test_1 -e POSTGRES_USER=test -e POSTGRES_PASSWORD=test \
             -e POSTGRES_DB=testdb -p 5434:5432 -d postgres"
        );
    }

    #[test]
    fn test_connection_env() {
        let manager = ContainerManager::new(ContainerSettings::default());
        let env = manager.connection_env(5436);

        assert!(env.contains(&("POSTGRES_HOST", "localhost".to_string())));
        assert!(env.contains(&("POSTGRES_PORT", "5436".to_string())));
        assert!(env.contains(&("POSTGRES_DB", "testdb".to_string())));
        assert_eq!(env.len(), 5);
    }

    #[test]
    fn test_start_with_missing_runtime() {
        let manager = ContainerManager::new(ContainerSettings {
            runtime: "/nonexistent/container-runtime".to_string(),
            ..Default::default()
        });

        let err = tokio_test::block_on(manager.start("postgres_test_1", 5434)).unwrap_err();
        match err {
            RunnerError::ContainerStart { name, port, reason } => {
                assert_eq!(name, "postgres_test_1");
                assert_eq!(port, 5434);
                assert!(reason.contains("failed to execute"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_start_reports_runtime_failure() {
        let manager = ContainerManager::new(ContainerSettings {
            runtime: "false".to_string(),
            ..Default::default()
        });

        let err = tokio_test::block_on(manager.start("postgres_test_2", 5435)).unwrap_err();
        assert!(matches!(err, RunnerError::ContainerStart { port: 5435, .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_swallows_errors() {
        let manager = ContainerManager::new(ContainerSettings {
            runtime: "false".to_string(),
            ..Default::default()
        });

        tokio_test::block_on(manager.remove("postgres_test_3"));
    }
}
