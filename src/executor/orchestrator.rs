//! Run orchestration
//!
//! Discovers test files, partitions them into batches and runs one task per
//! batch concurrently, then waits for all of them.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use super::BatchExecutor;
use crate::config::{RunConfig, StartFailurePolicy};
use crate::container::ContainerManager;
use crate::discovery::discover_files;
use crate::models::{partition, Batch, BatchReport, RunSummary, RunnerResult};
use crate::utils::Timer;

/// Owns one run: configuration plus the shared container manager
pub struct Orchestrator {
    config: Arc<RunConfig>,
    containers: Arc<ContainerManager>,
}

impl Orchestrator {
    pub fn new(config: RunConfig) -> Self {
        let containers = Arc::new(ContainerManager::new(config.container.clone()));
        Self {
            config: Arc::new(config),
            containers,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Validate, discover and partition without touching any container
    pub fn plan(&self) -> RunnerResult<Vec<Batch>> {
        self.config.validate()?;

        let files = discover_files(&self.config.root_path, &self.config.file_pattern)?;
        let batches = partition(
            &files,
            self.config.batch_size,
            self.config.base_port,
            &self.config.container.name_prefix,
        )?;

        info!(
            "Found {} test files under {} in {} batches of up to {}",
            files.len(),
            self.config.root_path.display(),
            batches.len(),
            self.config.batch_size
        );

        Ok(batches)
    }

    /// Run every batch concurrently and wait for all of them.
    ///
    /// Test failures are recorded in the summary. Under the abort policy a
    /// container that fails to start or become ready fails the whole run,
    /// after every started container has been removed.
    pub async fn run(&self) -> RunnerResult<RunSummary> {
        let summary = self.execute().await?;

        if self.config.start_failure == StartFailurePolicy::Abort {
            if let Some(err) = summary.first_container_error() {
                return Err(err);
            }
        }

        println!("All test batches completed.");
        Ok(summary)
    }

    async fn execute(&self) -> RunnerResult<RunSummary> {
        let started_at = Utc::now();
        let timer = Timer::start("test run");

        let batches = self.plan()?;
        let files_discovered = batches.iter().map(Batch::len).sum();

        let (cancel, _) = watch::channel(false);
        let cancel = Arc::new(cancel);

        let (pending, handles): (Vec<_>, Vec<_>) = batches
            .into_iter()
            .map(|batch| {
                let executor = BatchExecutor::new(
                    self.config.clone(),
                    self.containers.clone(),
                    cancel.clone(),
                );
                let pending = BatchReport::pending(&batch);
                let handle = tokio::spawn(async move { executor.run(&batch).await });
                (pending, handle)
            })
            .unzip();

        let reports = pending
            .into_iter()
            .zip(join_all(handles).await)
            .map(|(pending, joined)| match joined {
                Ok(report) => report,
                Err(e) => {
                    error!("Batch {} task failed: {}", pending.index, e);
                    pending
                }
            })
            .collect();

        let summary = RunSummary::new(started_at, files_discovered, reports);
        info!("Test run finished in {}ms", timer.stop());

        Ok(summary)
    }
}
