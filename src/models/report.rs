//! Batch and run reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::{Batch, RunnerError};

/// How a batch finished
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Every file ran and exited zero
    Completed,

    /// A test command exited non-zero; later files were skipped
    TestFailed {
        file: PathBuf,
        exit_code: Option<i32>,
    },

    /// The container could not be started
    ContainerStartFailed { reason: String },

    /// The container started but never reported ready
    NotReady { reason: String },

    /// The run was aborted before this batch finished
    Cancelled,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Completed)
    }

    /// Short status label used in tables and CSV exports
    pub fn label(&self) -> &'static str {
        match self {
            BatchOutcome::Completed => "completed",
            BatchOutcome::TestFailed { .. } => "test_failed",
            BatchOutcome::ContainerStartFailed { .. } => "container_start_failed",
            BatchOutcome::NotReady { .. } => "not_ready",
            BatchOutcome::Cancelled => "cancelled",
        }
    }

    /// Human readable detail, empty for outcomes without one
    pub fn detail(&self) -> String {
        match self {
            BatchOutcome::TestFailed { file, exit_code } => match exit_code {
                Some(code) => format!("{} (exit status {code})", file.display()),
                None => format!("{} (no exit status)", file.display()),
            },
            BatchOutcome::ContainerStartFailed { reason } | BatchOutcome::NotReady { reason } => {
                reason.clone()
            }
            BatchOutcome::Completed | BatchOutcome::Cancelled => String::new(),
        }
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detail = self.detail();
        if detail.is_empty() {
            write!(f, "{}", self.label())
        } else {
            write!(f, "{}: {}", self.label(), detail)
        }
    }
}

/// Result of running one batch
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchReport {
    pub index: usize,
    pub container_name: String,
    pub port: u16,
    pub files_total: usize,
    pub files_run: usize,
    pub outcome: BatchOutcome,
    pub duration_ms: u64,
}

impl BatchReport {
    /// Report for a batch that has not run anything yet
    pub fn pending(batch: &Batch) -> Self {
        Self {
            index: batch.index,
            container_name: batch.container_name.clone(),
            port: batch.port,
            files_total: batch.files.len(),
            files_run: 0,
            outcome: BatchOutcome::Cancelled,
            duration_ms: 0,
        }
    }

    pub fn finish(mut self, outcome: BatchOutcome, duration_ms: u64) -> Self {
        self.outcome = outcome;
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Run-level error for batches whose container never became usable
    pub fn container_error(&self) -> Option<RunnerError> {
        match &self.outcome {
            BatchOutcome::ContainerStartFailed { reason } => Some(RunnerError::ContainerStart {
                name: self.container_name.clone(),
                port: self.port,
                reason: reason.clone(),
            }),
            BatchOutcome::NotReady { reason } => Some(RunnerError::NotReady {
                name: self.container_name.clone(),
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch {} [{} :{}] {}/{} files, {} [{}ms]",
            self.index,
            self.container_name,
            self.port,
            self.files_run,
            self.files_total,
            self.outcome,
            self.duration_ms
        )
    }
}

/// Summary of a whole run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files_discovered: usize,
    pub batches: Vec<BatchReport>,
}

impl RunSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        files_discovered: usize,
        mut batches: Vec<BatchReport>,
    ) -> Self {
        batches.sort_by_key(|b| b.index);
        Self {
            started_at,
            finished_at: Utc::now(),
            files_discovered,
            batches,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.batches.iter().all(BatchReport::is_success)
    }

    pub fn failed_batches(&self) -> impl Iterator<Item = &BatchReport> {
        self.batches.iter().filter(|b| !b.is_success())
    }

    /// First container failure, in batch order
    pub fn first_container_error(&self) -> Option<RunnerError> {
        self.batches.iter().find_map(BatchReport::container_error)
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(index: usize) -> Batch {
        Batch {
            index,
            files: vec![PathBuf::from("a_test.go"), PathBuf::from("b_test.go")],
            container_name: format!("postgres_test_{index}"),
            port: 5433 + index as u16,
        }
    }

    #[test]
    fn test_pending_report() {
        let report = BatchReport::pending(&batch(2));
        assert_eq!(report.index, 2);
        assert_eq!(report.files_total, 2);
        assert_eq!(report.files_run, 0);
        assert!(!report.is_success());
    }

    #[test]
    fn test_summary_ordering_and_failures() {
        let ok = BatchReport::pending(&batch(2)).finish(BatchOutcome::Completed, 10);
        let failed = BatchReport::pending(&batch(1)).finish(
            BatchOutcome::TestFailed {
                file: PathBuf::from("b_test.go"),
                exit_code: Some(1),
            },
            20,
        );

        let summary = RunSummary::new(Utc::now(), 4, vec![ok, failed]);
        assert_eq!(summary.batches[0].index, 1);
        assert!(!summary.all_succeeded());
        assert_eq!(summary.failed_batches().count(), 1);
        assert!(summary.first_container_error().is_none());
    }

    #[test]
    fn test_container_error_from_outcome() {
        let report = BatchReport::pending(&batch(3)).finish(
            BatchOutcome::ContainerStartFailed {
                reason: "port is already allocated".into(),
            },
            0,
        );

        match report.container_error() {
            Some(RunnerError::ContainerStart { name, port, .. }) => {
                assert_eq!(name, "postgres_test_3");
                assert_eq!(port, 5436);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = BatchOutcome::TestFailed {
            file: PathBuf::from("x_test.go"),
            exit_code: Some(1),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "test_failed");
        assert_eq!(json["exit_code"], 1);
    }
}
