//! Test execution engine
//!
//! Runs every batch concurrently, each inside its own database container.

mod batch;
mod orchestrator;

pub use batch::BatchExecutor;
pub use orchestrator::Orchestrator;

#[cfg(all(test, unix))]
pub(crate) mod test_support;
