//! Data models for batched test runs
//!
//! This module contains the error taxonomy, the batch partition and the
//! per-batch reports produced by a run.

mod batch;
mod error;
mod report;

pub use batch::{partition, Batch};
pub use error::{RunnerError, RunnerResult};
pub use report::{BatchOutcome, BatchReport, RunSummary};
