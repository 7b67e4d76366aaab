//! State shared between the pool handle, producers and workers.
//!
//! One mutex guards the queue, the stopping flag, the blocked-producer count
//! and the lifecycle state. Two condition variables hang off it: `not_empty`
//! (workers wait, producers signal) and `not_full` (blocked producers wait,
//! workers signal after a dequeue when someone is waiting).

use super::queue::TaskQueue;
use super::task::Task;
use super::thread_pool::PoolState;
use crate::error::{Result, SubmitError};
use crate::telemetry::PoolMetrics;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::Instant;
use tracing::debug;

#[derive(Debug)]
pub(crate) struct PoolInner {
    pub queue: TaskQueue,
    /// Monotonic: once set it is never cleared.
    pub stopping: bool,
    pub blocked_producers: usize,
    pub state: PoolState,
}

#[derive(Debug)]
pub(crate) struct Shared {
    inner: Mutex<PoolInner>,
    not_empty: Condvar,
    not_full: Condvar,
    pub metrics: PoolMetrics,
}

impl Shared {
    pub fn new(queue_capacity: usize) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(PoolInner {
                queue: TaskQueue::with_capacity(queue_capacity)?,
                stopping: false,
                blocked_producers: 0,
                state: PoolState::Initialized,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            metrics: PoolMetrics::new(),
        })
    }

    pub fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock()
    }

    /// Enqueue without blocking. Rejects when stopping or when the queue holds
    /// `capacity` tasks already.
    pub fn try_enqueue(&self, task: Task) -> std::result::Result<(), SubmitError> {
        let mut inner = self.inner.lock();
        let task = self.check_admission(&inner, task)?;

        match inner.queue.push(task) {
            Ok(()) => {
                self.on_enqueued();
                Ok(())
            }
            Err(task) => {
                self.metrics.record_rejected_full();
                debug!(task = ?task.id(), "drop because queue full");
                Err(SubmitError::QueueFull {
                    capacity: inner.queue.capacity(),
                    task,
                })
            }
        }
    }

    /// Enqueue, waiting on `not_full` while the queue is at capacity.
    ///
    /// A producer parked here is released by `stop()`: the stopping flag is
    /// checked after every wake and ends the wait with `PoolStopping`, so a
    /// single broadcast is enough to free every blocked producer.
    pub fn enqueue(&self, task: Task) -> std::result::Result<(), SubmitError> {
        let mut inner = self.inner.lock();
        let mut task = self.check_admission(&inner, task)?;

        loop {
            match inner.queue.push(task) {
                Ok(()) => break,
                Err(rejected) => task = rejected,
            }

            inner.blocked_producers += 1;
            self.metrics.record_producer_wait();
            self.not_full.wait(&mut inner);
            inner.blocked_producers -= 1;

            if inner.stopping {
                self.metrics.record_rejected_stopping();
                debug!(task = ?task.id(), "blocked producer released by stop");
                return Err(SubmitError::PoolStopping { task });
            }
        }

        self.on_enqueued();
        Ok(())
    }

    fn check_admission(
        &self,
        inner: &PoolInner,
        task: Task,
    ) -> std::result::Result<Task, SubmitError> {
        if inner.stopping {
            self.metrics.record_rejected_stopping();
            debug!(task = ?task.id(), "drop because pool stopping");
            return Err(SubmitError::PoolStopping { task });
        }
        if inner.state == PoolState::Initialized {
            return Err(SubmitError::NotStarted { task });
        }
        Ok(task)
    }

    fn on_enqueued(&self) {
        self.metrics.record_submitted();
        self.not_empty.notify_one();
    }

    /// Take the head task, waking one blocked producer if any are waiting.
    pub fn dequeue(&self, inner: &mut MutexGuard<'_, PoolInner>) -> Option<Task> {
        let task = inner.queue.pop()?;
        if inner.blocked_producers > 0 {
            self.not_full.notify_one();
        }
        Some(task)
    }

    /// Park until there is work or the pool is stopping.
    pub fn wait_for_work(&self, inner: &mut MutexGuard<'_, PoolInner>) {
        if !inner.queue.is_empty() || inner.stopping {
            return;
        }

        let start = Instant::now();
        while inner.queue.is_empty() && !inner.stopping {
            self.not_empty.wait(inner);
        }
        self.metrics
            .record_idle_time(start.elapsed().as_nanos() as u64);
    }

    /// Set the stopping flag and wake every waiter on both conditions.
    /// Returns `true` the first time it is called.
    pub fn stop(&self) -> bool {
        let mut inner = self.inner.lock();
        let first = !inner.stopping;
        inner.stopping = true;
        if matches!(inner.state, PoolState::Initialized | PoolState::Running) {
            inner.state = PoolState::Stopping;
        }
        self.not_empty.notify_all();
        self.not_full.notify_all();
        first
    }
}
