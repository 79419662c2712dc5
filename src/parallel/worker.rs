//! Worker thread for parallel processing
//!
//! Each worker pulls one file at a time, runs the analysis tool on it and
//! reports through the shared sink and failure tracker.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use crate::invocation::InvocationBuilder;

use super::launcher::Launcher;
use super::queue::TaskReceiver;
use super::sink::OutputSink;
use super::tracker::FailureTracker;
use super::types::Task;

/// Everything a worker shares with its siblings
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub invocation: Arc<InvocationBuilder>,
    pub launcher: Arc<dyn Launcher>,
    pub sink: Arc<OutputSink>,
    pub tracker: FailureTracker,
    /// Scratch directory receiving one exported-fixes file per task
    pub fixes_dir: Option<PathBuf>,
}

impl WorkerContext {
    fn fixes_path(&self, task: &Task) -> Option<PathBuf> {
        self.fixes_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.yaml", task.id)))
    }
}

/// Worker thread: runs until the queue is closed
pub(crate) fn worker_thread(worker_id: usize, tasks: TaskReceiver, ctx: WorkerContext) {
    tracing::debug!(worker_id, "worker started");

    while let Some(guard) = tasks.next_guarded() {
        let task = &guard.task;
        // A panicking launch counts as a failed file; the worker keeps draining
        if panic::catch_unwind(AssertUnwindSafe(|| process_task(worker_id, task, &ctx))).is_err() {
            tracing::warn!(worker_id, file = %task.filename, "invocation panicked");
            ctx.tracker.record_failure(&task.filename);
        }
        // guard drop marks the task done
    }

    tracing::debug!(worker_id, "worker stopped, queue closed");
}

/// Run one task to completion; returns whether the tool exited cleanly.
pub(crate) fn process_task(worker_id: usize, task: &Task, ctx: &WorkerContext) -> bool {
    let fixes_path = ctx.fixes_path(task);
    let argv = ctx.invocation.build(&task.filename, fixes_path.as_deref());

    ctx.tracker.record_launch();
    let result = ctx.launcher.launch(&argv);
    let succeeded = result.succeeded();

    if !succeeded {
        tracing::debug!(
            worker_id,
            file = %task.filename,
            exit_code = ?result.exit_code,
            "invocation failed"
        );
        ctx.tracker.record_failure(&task.filename);
    }

    if let Err(e) = ctx.sink.emit_result(&argv, &result) {
        tracing::warn!(worker_id, file = %task.filename, "{:#}", e);
    }

    succeeded
}
