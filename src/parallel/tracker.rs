//! Thread-safe failure tracking for parallel processing
//!
//! Workers record files whose invocation did not exit cleanly; the final
//! exit status is derived from whether anything was recorded.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::platform::ExitCode;

#[derive(Debug, Default, Clone)]
pub struct FailureTracker {
    failed: Arc<Mutex<Vec<String>>>,
    launched: Arc<AtomicUsize>,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the failure list with poison recovery
    fn lock_failed(&self) -> MutexGuard<'_, Vec<String>> {
        match self.failed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("worker thread panicked, recovering failure list");
                poisoned.into_inner()
            }
        }
    }

    pub fn record_launch(&self) {
        self.launched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, filename: &str) {
        self.lock_failed().push(filename.to_string());
    }

    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::Relaxed)
    }

    /// Failed files in the order workers reported them (scheduling dependent)
    pub fn failed_files(&self) -> Vec<String> {
        self.lock_failed().clone()
    }
}

/// Non-empty failure list means a failed run
pub fn exit_code_for(failed: &[String]) -> ExitCode {
    if failed.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    }
}
