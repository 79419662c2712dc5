//! Parallel processing module for tidyrun
//!
//! A single producer feeds file names into a bounded queue; a fixed pool of
//! worker threads runs the analysis tool on each one and writes the captured
//! output through a shared, lock-protected sink.
//!
//! # Module Structure
//!
//! - `types`: Tasks, invocation results and pool configuration
//! - `queue`: Bounded task queue with drain tracking
//! - `launcher`: Subprocess execution behind the `Launcher` trait
//! - `sink`: Serialized stdout/stderr output
//! - `tracker`: Failure list and exit status
//! - `worker`: Worker thread loop
//! - `processor`: `Dispatcher` orchestration

mod launcher;
mod processor;
mod queue;
mod sink;
mod tracker;
mod types;
mod worker;

// Re-export public types
pub use launcher::{Launcher, ProcessLauncher};
pub use processor::{Dispatcher, RunReport, WorkerPool};
pub use queue::{TaskGuard, TaskQueue, TaskReceiver};
pub use sink::OutputSink;
pub use tracker::{exit_code_for, FailureTracker};
pub use types::{InvocationResult, ParallelConfig, Task};
