// worker thread stuff
use super::shared::Shared;
use super::task::{Task, WorkerContext};
use parking_lot::MutexGuard;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Instant;
use tracing::{debug, error, trace};

pub type WorkerId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerStatus {
    /// Not yet running, or parked waiting for work.
    Idle = 0,
    /// Executing tasks back to back until the queue is empty.
    Draining = 1,
    /// Saw an empty queue with the pool stopping and exited.
    Stopped = 2,
    /// A callback panicked and unwound the worker thread.
    Panicked = 3,
}

impl WorkerStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => WorkerStatus::Draining,
            2 => WorkerStatus::Stopped,
            3 => WorkerStatus::Panicked,
            _ => WorkerStatus::Idle,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerStatus::Stopped | WorkerStatus::Panicked)
    }
}

// stats for each worker
#[derive(Debug)]
pub struct WorkerState {
    status: AtomicU8,
    pub tasks_executed: AtomicU64,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            status: AtomicU8::new(WorkerStatus::Idle as u8),
            tasks_executed: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: WorkerStatus) {
        self.status.store(status as u8, Ordering::Release);
    }
}

/// Point-in-time view of one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSnapshot {
    pub id: WorkerId,
    pub status: WorkerStatus,
    pub tasks_executed: u64,
}

#[derive(Debug)]
pub(crate) struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub state: WorkerState,
}

impl Worker {
    pub fn new(id: WorkerId, name: String) -> Self {
        Self {
            id,
            name,
            state: WorkerState::new(),
        }
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.id,
            status: self.state.status(),
            tasks_executed: self.state.tasks_executed.load(Ordering::Relaxed),
        }
    }

    // main loop
    pub fn run(&self, shared: &Shared) {
        let span = tracing::debug_span!("worker", id = self.id);
        let _enter = span.enter();
        debug!("worker started");

        let ctx = WorkerContext::new(self.id, self.name.clone());
        let _unwind = UnwindGuard {
            worker: self,
            shared,
        };

        let mut inner = shared.lock();
        loop {
            self.state.set_status(WorkerStatus::Idle);
            shared.wait_for_work(&mut inner);

            // woken with an empty queue means the pool is stopping
            let Some(mut task) = shared.dequeue(&mut inner) else {
                self.state.set_status(WorkerStatus::Stopped);
                debug!(
                    executed = self.state.tasks_executed.load(Ordering::Relaxed),
                    "worker stopped"
                );
                return;
            };

            self.state.set_status(WorkerStatus::Draining);
            loop {
                MutexGuard::unlocked(&mut inner, || self.execute_task(task, &ctx, shared));

                match shared.dequeue(&mut inner) {
                    Some(next) => task = next,
                    None => break,
                }
            }
        }
    }

    fn execute_task(&self, task: Task, ctx: &WorkerContext, shared: &Shared) {
        let tid = task.id();
        let queued_ns = task.submit_time().elapsed().as_nanos() as u64;
        let start = Instant::now();

        task.run(ctx);

        let duration_ns = start.elapsed().as_nanos() as u64;
        trace!(task = ?tid, queued_ns, duration_ns, "task done");

        shared.metrics.record_task_execution(duration_ns);
        self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Marks the worker as panicked if its thread unwinds out of `run`.
struct UnwindGuard<'a> {
    worker: &'a Worker,
    shared: &'a Shared,
}

impl Drop for UnwindGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.worker.state.set_status(WorkerStatus::Panicked);
            self.shared.metrics.record_task_panic();
            error!(worker = self.worker.id, "task panicked, worker exiting");
        }
    }
}
