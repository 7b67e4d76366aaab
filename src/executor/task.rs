//! Task representation and execution.

use super::worker::WorkerId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Identity of the worker running a task, passed to every callback.
#[derive(Debug)]
pub struct WorkerContext {
    id: WorkerId,
    name: String,
}

impl WorkerContext {
    pub(crate) fn new(id: WorkerId, name: String) -> Self {
        Self { id, name }
    }

    /// Ordinal of the worker, in `0..worker_count`.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

type Callback = Box<dyn FnOnce(&WorkerContext) + Send + 'static>;

/// A unit of work: a callback plus whatever it captured.
///
/// Owned by the queue from enqueue until dequeue, then moved into the worker
/// that runs it and dropped after the call.
pub struct Task {
    id: TaskId,
    func: Callback,
    submit_time: Instant,
}

impl Task {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&WorkerContext) + Send + 'static,
    {
        Task {
            id: TaskId::next(),
            func: Box::new(f),
            submit_time: Instant::now(),
        }
    }

    /// Callback with a separate, typed argument: invoked as `f(worker, arg)`.
    pub fn with_arg<A, F>(f: F, arg: A) -> Self
    where
        A: Send + 'static,
        F: FnOnce(&WorkerContext, A) + Send + 'static,
    {
        Task::new(move |worker| f(worker, arg))
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// When the task was created.
    pub fn submit_time(&self) -> Instant {
        self.submit_time
    }

    pub(crate) fn run(self, worker: &WorkerContext) {
        (self.func)(worker);
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("submit_time", &self.submit_time)
            .finish_non_exhaustive()
    }
}
