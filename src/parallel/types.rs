//! Type definitions for parallel processing
//!
//! Contains the task, per-invocation result and pool configuration.

use std::borrow::Cow;

/// One file waiting to be analyzed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    pub filename: String,
}

impl Task {
    pub fn new(id: u64, filename: impl Into<String>) -> Self {
        Self {
            id,
            filename: filename.into(),
        }
    }
}

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    pub num_workers: usize,
    /// Queue bound; `None` means one slot per worker
    pub queue_capacity: Option<usize>,
}

impl ParallelConfig {
    pub fn with_workers(num_workers: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
            queue_capacity: None,
        }
    }

    pub fn effective_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.num_workers).max(1)
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self::with_workers(num_cpus::get())
    }
}

/// Captured outcome of one analysis process
#[derive(Debug, Clone, Default)]
pub struct InvocationResult {
    /// Exit code; `None` when the process was killed by a signal or never started
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl InvocationResult {
    pub fn exited(exit_code: i32, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout,
            stderr,
        }
    }

    /// The binary could not be started; the error becomes the task's stderr.
    pub fn launch_failure(program: &str, error: &std::io::Error) -> Self {
        Self {
            exit_code: None,
            stdout: Vec::new(),
            stderr: format!("error: unable to launch '{}': {}\n", program, error).into_bytes(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_defaults_to_pool_size() {
        let config = ParallelConfig::with_workers(6);
        assert_eq!(config.effective_capacity(), 6);

        let config = ParallelConfig {
            num_workers: 6,
            queue_capacity: Some(64),
        };
        assert_eq!(config.effective_capacity(), 64);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let config = ParallelConfig::with_workers(0);
        assert_eq!(config.num_workers, 1);
        assert_eq!(config.effective_capacity(), 1);
    }

    #[test]
    fn test_only_zero_exit_succeeds() {
        assert!(InvocationResult::exited(0, vec![], vec![]).succeeded());
        assert!(!InvocationResult::exited(1, vec![], vec![]).succeeded());
        assert!(!InvocationResult::default().succeeded());
    }

    #[test]
    fn test_launch_failure_message() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory");
        let result = InvocationResult::launch_failure("clang-tidy-99", &err);
        assert!(!result.succeeded());
        assert!(result.stdout.is_empty());
        assert!(result.stderr_text().contains("clang-tidy-99"));
        assert!(result.stderr_text().ends_with('\n'));
    }

    #[test]
    fn test_lossy_decoding() {
        let result = InvocationResult::exited(0, vec![b'o', b'k', 0xff], vec![]);
        assert!(result.stdout_text().starts_with("ok"));
    }
}
