//! Bounded task queue with drain tracking
//!
//! Tasks travel over a bounded crossbeam channel. A separate pending counter
//! is raised before each send and lowered by `task_done`, so `join` returns
//! only once every enqueued task has been received *and* finished.

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use super::types::Task;

#[derive(Debug, Default)]
struct Pending {
    count: Mutex<usize>,
    drained: Condvar,
}

impl Pending {
    /// Lock the counter with poison recovery
    fn lock(&self) -> MutexGuard<'_, usize> {
        match self.count.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("worker thread panicked, recovering pending task count");
                poisoned.into_inner()
            }
        }
    }

    fn raise(&self) {
        *self.lock() += 1;
    }

    fn lower(&self) {
        let mut count = self.lock();
        debug_assert!(*count > 0, "task_done called more times than tasks were put");
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    fn wait_drained(&self) {
        let mut count = self.lock();
        while *count > 0 {
            count = match self.drained.wait(count) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

/// Producer side: owns the sender, so dropping it closes the queue
pub struct TaskQueue {
    sender: Sender<Task>,
    pending: Arc<Pending>,
    capacity: usize,
}

impl TaskQueue {
    /// Create the queue and its consumer handle.
    ///
    /// The queue keeps no receiver of its own: once every clone of the
    /// returned handle is dropped, `put` fails instead of blocking.
    pub fn bounded(capacity: usize) -> (Self, TaskReceiver) {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        let pending = Arc::new(Pending::default());
        let tasks = TaskReceiver {
            receiver,
            pending: Arc::clone(&pending),
        };
        let queue = Self {
            sender,
            pending,
            capacity,
        };
        (queue, tasks)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueue a task, blocking while the queue is full.
    pub fn put(&self, task: Task) -> Result<()> {
        self.pending.raise();
        if let Err(e) = self.sender.send(task) {
            self.pending.lower();
            return Err(anyhow!(
                "no workers left to receive '{}'",
                e.into_inner().filename
            ));
        }
        Ok(())
    }

    /// Block until every task put so far has been marked done.
    pub fn join(&self) {
        self.pending.wait_drained();
    }

    /// Stop accepting work; idle workers see the queue as closed once it is empty.
    pub fn close(self) {
        drop(self.sender);
    }
}

/// Consumer side; each worker holds its own clone
#[derive(Clone)]
pub struct TaskReceiver {
    receiver: Receiver<Task>,
    pending: Arc<Pending>,
}

impl TaskReceiver {
    /// Block for the next task; `None` once the queue is closed and empty.
    pub fn get(&self) -> Option<Task> {
        self.receiver.recv().ok()
    }

    /// Mark one received task as fully processed.
    pub fn task_done(&self) {
        self.pending.lower();
    }

    /// Receive a task wrapped in a guard that marks it done when dropped,
    /// including when the worker unwinds.
    pub fn next_guarded(&self) -> Option<TaskGuard<'_>> {
        self.get().map(|task| TaskGuard {
            task,
            receiver: self,
        })
    }
}

pub struct TaskGuard<'a> {
    pub task: Task,
    receiver: &'a TaskReceiver,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.receiver.task_done();
    }
}
