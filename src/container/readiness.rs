//! Container readiness
//!
//! Either sleeps for a fixed warm-up delay or polls `pg_isready` inside the
//! container until it answers.

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{ContainerHandle, ContainerManager};
use crate::config::ReadinessMode;
use crate::models::{RunnerError, RunnerResult};

impl ContainerManager {
    /// Block until the container is usable according to `mode`
    pub async fn wait_ready(
        &self,
        handle: &ContainerHandle,
        mode: &ReadinessMode,
    ) -> RunnerResult<()> {
        match *mode {
            ReadinessMode::FixedDelay { secs } => {
                info!(
                    "Container {} started on port {}. Waiting {}s for PostgreSQL to be ready...",
                    handle.name(),
                    handle.port(),
                    secs
                );
                sleep(Duration::from_secs(secs)).await;
                Ok(())
            }
            ReadinessMode::Probe {
                timeout_secs,
                interval_secs,
            } => self.probe(handle, timeout_secs, interval_secs).await,
        }
    }

    async fn probe(
        &self,
        handle: &ContainerHandle,
        timeout_secs: u64,
        interval_secs: u64,
    ) -> RunnerResult<()> {
        let start = Instant::now();
        let timeout = Duration::from_secs(timeout_secs);

        info!(
            "Waiting for PostgreSQL in {} (timeout: {}s)",
            handle.name(),
            timeout_secs
        );

        loop {
            if self.is_ready(handle.name()).await {
                info!(
                    "Container {} ready after {}ms",
                    handle.name(),
                    start.elapsed().as_millis()
                );
                return Ok(());
            }

            if start.elapsed() >= timeout {
                warn!("Timeout waiting for PostgreSQL in {}", handle.name());
                return Err(RunnerError::NotReady {
                    name: handle.name().to_string(),
                    reason: format!("pg_isready did not succeed within {timeout_secs}s"),
                });
            }

            debug!(
                "PostgreSQL in {} not ready yet, retrying in {}s...",
                handle.name(),
                interval_secs
            );
            sleep(Duration::from_secs(interval_secs)).await;
        }
    }

    /// Single `pg_isready` check inside the container
    pub async fn is_ready(&self, name: &str) -> bool {
        match self.check_ready(name).await {
            Ok(()) => true,
            Err(e) => {
                debug!("{}", e);
                false
            }
        }
    }

    async fn check_ready(&self, name: &str) -> RunnerResult<()> {
        let settings = self.settings();
        let args = [
            "exec",
            name,
            "pg_isready",
            "-U",
            settings.user.as_str(),
            "-d",
            settings.database.as_str(),
        ];

        self.run_quiet(&args, |reason| RunnerError::NotReady {
            name: name.to_string(),
            reason,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ContainerSettings, ReadinessMode};
    use crate::container::ContainerManager;
    use crate::models::RunnerError;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_succeeds_immediately() {
        let manager = ContainerManager::new(ContainerSettings {
            runtime: "true".to_string(),
            ..Default::default()
        });
        let handle = manager.start("postgres_test_1", 5434).await.unwrap();

        let mode = ReadinessMode::Probe {
            timeout_secs: 5,
            interval_secs: 1,
        };
        assert!(manager.wait_ready(&handle, &mode).await.is_ok());
        manager.cleanup(handle).await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_times_out() {
        let manager = ContainerManager::new(ContainerSettings {
            runtime: "true".to_string(),
            ..Default::default()
        });
        let handle = manager.start("postgres_test_2", 5435).await.unwrap();

        let failing = ContainerManager::new(ContainerSettings {
            runtime: "false".to_string(),
            ..Default::default()
        });
        let mode = ReadinessMode::Probe {
            timeout_secs: 0,
            interval_secs: 1,
        };

        let err = failing.wait_ready(&handle, &mode).await.unwrap_err();
        assert!(matches!(err, RunnerError::NotReady { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_check_is_a_readiness_error() {
        let manager = ContainerManager::new(ContainerSettings {
            runtime: "false".to_string(),
            ..Default::default()
        });

        match manager.check_ready("postgres_test_4").await.unwrap_err() {
            RunnerError::NotReady { name, reason } => {
                assert_eq!(name, "postgres_test_4");
                assert!(reason.starts_with("false exec exited with"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!manager.is_ready("postgres_test_4").await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fixed_delay() {
        let manager = ContainerManager::new(ContainerSettings {
            runtime: "true".to_string(),
            ..Default::default()
        });
        let handle = manager.start("postgres_test_3", 5436).await.unwrap();

        let mode = ReadinessMode::FixedDelay { secs: 0 };
        assert!(manager.wait_ready(&handle, &mode).await.is_ok());
    }
}
