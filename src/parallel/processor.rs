//! Main dispatcher
//!
//! Starts the worker pool, feeds it every selected file and waits until the
//! queue has drained. Workers are detached: once the queue is closed they
//! exit on their own, nobody joins them on the normal path.

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crate::invocation::InvocationBuilder;
use crate::platform::ExitCode;
use crate::selection::FileSelector;

use super::launcher::{Launcher, ProcessLauncher};
use super::queue::{TaskQueue, TaskReceiver};
use super::sink::OutputSink;
use super::tracker::{exit_code_for, FailureTracker};
use super::types::{ParallelConfig, Task};
use super::worker::{worker_thread, WorkerContext};

/// Outcome of one dispatcher run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub selected: usize,
    pub launched: usize,
    /// Failed files; order depends on scheduling
    pub failed_files: Vec<String>,
}

impl RunReport {
    pub fn exit_code(&self) -> ExitCode {
        exit_code_for(&self.failed_files)
    }

    pub fn succeeded(&self) -> bool {
        self.failed_files.is_empty()
    }
}

/// Handles to running worker threads
pub struct WorkerPool {
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `size` workers sharing `tasks`. The handle is consumed so the
    /// workers hold the only receivers.
    pub(crate) fn spawn(size: usize, tasks: TaskReceiver, ctx: &WorkerContext) -> Result<Self> {
        let mut handles = Vec::with_capacity(size);
        for worker_id in 0..size {
            let tasks = tasks.clone();
            let ctx = ctx.clone();
            let handle = thread::Builder::new()
                .name(format!("tidyrun-worker-{}", worker_id))
                .spawn(move || worker_thread(worker_id, tasks, ctx))
                .map_err(|e| anyhow!("Failed to spawn worker thread {}: {}", worker_id, e))?;
            handles.push(handle);
        }
        Ok(Self { handles })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Let the workers run out on their own
    pub fn detach(self) {
        drop(self.handles);
    }

    /// Close the queue and wait for every worker to stop.
    pub fn shutdown(self, queue: TaskQueue) -> Result<()> {
        queue.close();
        let mut panicked = 0;
        for handle in self.handles {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            return Err(anyhow!("{} worker thread(s) panicked", panicked));
        }
        Ok(())
    }
}

pub struct Dispatcher {
    config: ParallelConfig,
    invocation: Arc<InvocationBuilder>,
    launcher: Arc<dyn Launcher>,
    sink: Arc<OutputSink>,
    fixes_dir: Option<PathBuf>,
}

impl Dispatcher {
    pub fn new(config: ParallelConfig, invocation: InvocationBuilder) -> Self {
        Self {
            config,
            invocation: Arc::new(invocation),
            launcher: Arc::new(ProcessLauncher),
            sink: Arc::new(OutputSink::stdio()),
            fixes_dir: None,
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_sink(mut self, sink: Arc<OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Give each invocation its own exported-fixes file under `dir`
    pub fn with_fixes_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.fixes_dir = dir;
        self
    }

    fn worker_context(&self, tracker: &FailureTracker) -> WorkerContext {
        WorkerContext {
            invocation: Arc::clone(&self.invocation),
            launcher: Arc::clone(&self.launcher),
            sink: Arc::clone(&self.sink),
            tracker: tracker.clone(),
            fixes_dir: self.fixes_dir.clone(),
        }
    }

    /// Analyze every candidate accepted by `selector` and wait for all of them.
    pub fn run(&self, candidates: &[String], selector: &FileSelector) -> Result<RunReport> {
        let (report, pool, queue) = self.run_to_drain(candidates, selector)?;
        queue.close();
        pool.detach();
        Ok(report)
    }

    /// Same as `run`, but joins every worker before returning.
    pub fn run_and_shutdown(&self, candidates: &[String], selector: &FileSelector) -> Result<RunReport> {
        let (report, pool, queue) = self.run_to_drain(candidates, selector)?;
        pool.shutdown(queue)?;
        Ok(report)
    }

    fn run_to_drain(
        &self,
        candidates: &[String],
        selector: &FileSelector,
    ) -> Result<(RunReport, WorkerPool, TaskQueue)> {
        let tracker = FailureTracker::new();
        let (queue, tasks) = TaskQueue::bounded(self.config.effective_capacity());
        let pool = WorkerPool::spawn(self.config.num_workers, tasks, &self.worker_context(&tracker))?;

        tracing::debug!(
            workers = pool.size(),
            queue_capacity = queue.capacity(),
            candidates = candidates.len(),
            "worker pool started"
        );

        let mut selected = 0u64;
        for filename in selector.select(candidates) {
            queue.put(Task::new(selected, filename.as_str()))?;
            selected += 1;
        }
        tracing::debug!(selected, "all tasks enqueued");

        queue.join();
        if let Err(e) = self.sink.flush() {
            tracing::warn!("{:#}", e);
        }

        let report = RunReport {
            selected: selected as usize,
            launched: tracker.launched(),
            failed_files: tracker.failed_files(),
        };
        tracing::info!(
            launched = report.launched,
            failed = report.failed_files.len(),
            "all tasks drained"
        );
        if !report.succeeded() {
            tracing::debug!(files = ?report.failed_files, "files with failing invocations");
        }

        Ok((report, pool, queue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::types::InvocationResult;
    use std::collections::HashSet;
    use std::io;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingLauncher {
        files: Mutex<Vec<String>>,
    }

    impl Launcher for CountingLauncher {
        fn launch(&self, argv: &[String]) -> InvocationResult {
            self.files.lock().unwrap().push(argv[1].clone());
            let code = if argv[1].starts_with("fail") { 2 } else { 0 };
            InvocationResult::exited(code, Vec::new(), Vec::new())
        }
    }

    fn dispatcher(workers: usize, launcher: Arc<CountingLauncher>) -> Dispatcher {
        Dispatcher::new(ParallelConfig::with_workers(workers), InvocationBuilder::default())
            .with_launcher(launcher)
            .with_sink(Arc::new(OutputSink::new(io::sink(), io::sink())))
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_every_selected_file_runs_once() {
        let launcher = Arc::new(CountingLauncher::default());
        let candidates: Vec<String> = (0..40).map(|i| format!("src/f{}.cpp", i)).collect();
        let report = dispatcher(4, Arc::clone(&launcher))
            .run_and_shutdown(&candidates, &FileSelector::match_all())
            .unwrap();

        assert_eq!(report.selected, 40);
        assert_eq!(report.launched, 40);
        let seen: HashSet<String> = launcher.files.lock().unwrap().iter().cloned().collect();
        assert_eq!(seen.len(), 40);
        assert_eq!(report.exit_code() as i32, 0);
    }

    #[test]
    fn test_unselected_files_never_launch() {
        let launcher = Arc::new(CountingLauncher::default());
        let selector = FileSelector::new(&["a.*", "b.*"]).unwrap();
        let report = dispatcher(2, Arc::clone(&launcher))
            .run_and_shutdown(&names(&["apple.cpp", "banana.cpp", "carrot.cpp"]), &selector)
            .unwrap();

        assert_eq!(report.launched, 2);
        let mut files = launcher.files.lock().unwrap().clone();
        files.sort();
        assert_eq!(files, names(&["apple.cpp", "banana.cpp"]));
    }

    #[test]
    fn test_pool_size_does_not_change_failures() {
        let candidates = names(&["fail_one.cpp", "ok.cpp", "fail_two.cpp"]);

        let serial = dispatcher(1, Arc::new(CountingLauncher::default()))
            .run_and_shutdown(&candidates, &FileSelector::match_all())
            .unwrap();
        let parallel = dispatcher(3, Arc::new(CountingLauncher::default()))
            .run_and_shutdown(&candidates, &FileSelector::match_all())
            .unwrap();

        assert_eq!(serial.launched, 3);
        assert_eq!(parallel.launched, 3);
        let serial_failed: HashSet<_> = serial.failed_files.into_iter().collect();
        let parallel_failed: HashSet<_> = parallel.failed_files.into_iter().collect();
        assert_eq!(serial_failed, parallel_failed);
        assert_eq!(serial_failed.len(), 2);
    }

    #[test]
    fn test_more_files_than_queue_slots() {
        let launcher = Arc::new(CountingLauncher::default());
        let candidates: Vec<String> = (0..100).map(|i| format!("f{}.cpp", i)).collect();
        let config = ParallelConfig {
            num_workers: 2,
            queue_capacity: Some(1),
        };
        let report = Dispatcher::new(config, InvocationBuilder::default())
            .with_launcher(launcher.clone())
            .with_sink(Arc::new(OutputSink::new(io::sink(), io::sink())))
            .run(&candidates, &FileSelector::match_all())
            .unwrap();

        assert_eq!(report.launched, 100);
        assert!(report.succeeded());
    }

    #[test]
    fn test_empty_candidate_list() {
        let launcher = Arc::new(CountingLauncher::default());
        let report = dispatcher(3, Arc::clone(&launcher))
            .run_and_shutdown(&[], &FileSelector::match_all())
            .unwrap();
        assert_eq!(report.selected, 0);
        assert_eq!(report.launched, 0);
        assert_eq!(report.exit_code() as i32, 0);
    }
}
