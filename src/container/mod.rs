//! Container lifecycle management
//!
//! Starts, probes and removes the per-batch database containers through a
//! container runtime CLI.

mod manager;
mod readiness;

pub use manager::{ContainerHandle, ContainerManager};
