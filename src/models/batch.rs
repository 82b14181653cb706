//! Batch partitioning
//!
//! Splits the discovered file list into contiguous, fixed-size batches and
//! assigns each batch its container name and host port.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::{RunnerError, RunnerResult};

/// A contiguous group of test files served by one container
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Batch {
    /// 1-based batch index
    pub index: usize,

    /// Files in discovery order
    pub files: Vec<PathBuf>,

    /// Name of the container owned by this batch
    pub container_name: String,

    /// Host port the container is published on
    pub port: u16,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.files.len()
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch {} ({} files, container {} on port {})",
            self.index,
            self.files.len(),
            self.container_name,
            self.port
        )
    }
}

/// Container name for the batch with the given 1-based index
pub fn container_name(prefix: &str, index: usize) -> String {
    format!("{prefix}_{index}")
}

/// Partition `files` into batches of `batch_size`.
///
/// Every batch is full except possibly the last one. Batch `i` gets port
/// `base_port + i`, so names and ports never collide within a run.
pub fn partition(
    files: &[PathBuf],
    batch_size: usize,
    base_port: u16,
    name_prefix: &str,
) -> RunnerResult<Vec<Batch>> {
    if batch_size == 0 {
        return Err(RunnerError::InvalidConfig(
            "block size must be at least 1".to_string(),
        ));
    }

    files
        .chunks(batch_size)
        .enumerate()
        .map(|(offset, chunk)| {
            let index = offset + 1;
            let port = u16::try_from(u32::from(base_port) + index as u32).map_err(|_| {
                RunnerError::InvalidConfig(format!(
                    "port for batch {index} exceeds 65535 (base port {base_port})"
                ))
            })?;

            Ok(Batch {
                index,
                files: chunk.to_vec(),
                container_name: container_name(name_prefix, index),
                port,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn files(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("f{i}_test.go"))).collect()
    }

    #[test]
    fn test_partition_sizes() {
        let batches = partition(&files(5), 2, 5433, "postgres_test").unwrap();
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_partition_preserves_order() {
        for n in 0..12 {
            for size in 1..6 {
                let input = files(n);
                let batches = partition(&input, size, 5433, "postgres_test").unwrap();

                assert_eq!(batches.len(), n.div_ceil(size));
                for batch in batches.iter().take(batches.len().saturating_sub(1)) {
                    assert_eq!(batch.len(), size);
                }

                let joined: Vec<PathBuf> =
                    batches.into_iter().flat_map(|b| b.files).collect();
                assert_eq!(joined, input);
            }
        }
    }

    #[test]
    fn test_partition_names_and_ports() {
        let batches = partition(&files(7), 3, 5433, "postgres_test").unwrap();

        assert_eq!(batches[0].index, 1);
        assert_eq!(batches[0].container_name, "postgres_test_1");
        assert_eq!(batches[0].port, 5434);
        assert_eq!(batches[2].container_name, "postgres_test_3");
        assert_eq!(batches[2].port, 5436);

        let names: HashSet<_> = batches.iter().map(|b| b.container_name.clone()).collect();
        let ports: HashSet<_> = batches.iter().map(|b| b.port).collect();
        assert_eq!(names.len(), batches.len());
        assert_eq!(ports.len(), batches.len());
    }

    #[test]
    fn test_partition_empty() {
        let batches = partition(&[], 25, 5433, "postgres_test").unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn test_partition_rejects_zero_size() {
        let err = partition(&files(3), 0, 5433, "postgres_test").unwrap_err();
        assert!(matches!(err, RunnerError::InvalidConfig(_)));
    }

    #[test]
    fn test_partition_port_overflow() {
        assert!(partition(&files(2), 1, 65534, "postgres_test").is_err());
        assert!(partition(&files(1), 1, 65534, "postgres_test").is_ok());
    }
}
