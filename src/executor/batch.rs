//! Batch execution
//!
//! Runs the files of one batch sequentially against that batch's container.

use std::borrow::Cow;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::{RunConfig, StartFailurePolicy};
use crate::container::{ContainerHandle, ContainerManager};
use crate::models::{Batch, BatchOutcome, BatchReport, RunnerError, RunnerResult};
use crate::utils::Timer;

/// Executes a single batch: start container, wait, run files, clean up
pub struct BatchExecutor {
    config: Arc<RunConfig>,
    containers: Arc<ContainerManager>,
    cancel: Arc<watch::Sender<bool>>,
}

impl BatchExecutor {
    pub fn new(
        config: Arc<RunConfig>,
        containers: Arc<ContainerManager>,
        cancel: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            config,
            containers,
            cancel,
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Cancel sibling batches when the policy says a broken container ends the run
    fn signal_start_failure(&self) {
        if self.config.start_failure == StartFailurePolicy::Abort {
            self.cancel.send_replace(true);
        }
    }

    /// Run the batch. The container is removed on every path once `start`
    /// has been attempted.
    pub async fn run(&self, batch: &Batch) -> BatchReport {
        let timer = Timer::start(format!("batch {}", batch.index));
        let mut report = BatchReport::pending(batch);

        if self.is_cancelled() {
            warn!("Run aborted, skipping {}", batch);
            return report.finish(BatchOutcome::Cancelled, timer.stop());
        }

        let handle = match self
            .containers
            .start(&batch.container_name, batch.port)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                error!("{}", e);
                // `run` may have created the container before failing to bind
                self.containers.remove(&batch.container_name).await;
                self.signal_start_failure();
                return report.finish(
                    BatchOutcome::ContainerStartFailed {
                        reason: failure_reason(e),
                    },
                    timer.stop(),
                );
            }
        };

        let outcome = self.run_in_container(batch, &handle, &mut report).await;
        self.containers.cleanup(handle).await;

        if outcome.is_success() {
            println!(
                "Completed batch in container {} on port {}",
                batch.container_name, batch.port
            );
        }

        report.finish(outcome, timer.stop())
    }

    async fn run_in_container(
        &self,
        batch: &Batch,
        handle: &ContainerHandle,
        report: &mut BatchReport,
    ) -> BatchOutcome {
        let mut cancelled = self.cancel.subscribe();
        let readiness = self.config.readiness();

        let ready = tokio::select! {
            ready = self.containers.wait_ready(handle, &readiness) => ready,
            _ = cancelled.wait_for(|c| *c) => {
                warn!("Run aborted while {} was warming up", handle.name());
                return BatchOutcome::Cancelled;
            }
        };

        if let Err(e) = ready {
            error!("{}", e);
            self.signal_start_failure();
            return BatchOutcome::NotReady {
                reason: failure_reason(e),
            };
        }

        for file in &batch.files {
            if self.is_cancelled() {
                warn!(
                    "Run aborted, skipping {} remaining files in {}",
                    batch.files.len() - report.files_run,
                    handle.name()
                );
                return BatchOutcome::Cancelled;
            }

            if let Err(e) = self.run_test_file(file, handle.port()).await {
                error!("{}", e);
                return match e {
                    RunnerError::TestCommand { file, exit_code } => {
                        report.files_run += 1;
                        BatchOutcome::TestFailed { file, exit_code }
                    }
                    _ => BatchOutcome::TestFailed {
                        file: file.clone(),
                        exit_code: None,
                    },
                };
            }
            report.files_run += 1;
        }

        BatchOutcome::Completed
    }

    /// Run the test command for one file through `sh -c`, with the batch's
    /// connection variables layered over the inherited environment. Output
    /// streams are inherited.
    pub async fn run_test_file(&self, file: &Path, port: u16) -> RunnerResult<()> {
        let command_line = format!(
            "{} {}",
            self.config.test_command,
            shell_quote(&file.to_string_lossy())
        );
        info!("Running command: {}", command_line);

        let status = Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .envs(self.containers.connection_env(port))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| RunnerError::CommandSpawn {
                command: command_line.clone(),
                reason: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(RunnerError::TestCommand {
                file: file.to_path_buf(),
                exit_code: status.code(),
            })
        }
    }
}

fn failure_reason(e: RunnerError) -> String {
    match e {
        RunnerError::ContainerStart { reason, .. } | RunnerError::NotReady { reason, .. } => {
            reason
        }
        other => other.to_string(),
    }
}

/// Quote `arg` for `sh` unless it only holds characters the shell leaves alone
fn shell_quote(arg: &str) -> Cow<'_, str> {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+,:=@%".contains(c));

    if plain {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}
