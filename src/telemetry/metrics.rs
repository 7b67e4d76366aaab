//! Metrics collection for pool monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Pool metrics collector
#[derive(Debug)]
pub struct PoolMetrics {
    // Task counters
    tasks_submitted: AtomicU64,
    tasks_executed: AtomicU64,
    tasks_panicked: AtomicU64,
    tasks_rejected_full: AtomicU64,
    tasks_rejected_stopping: AtomicU64,
    producer_waits: AtomicU64,

    // Timing metrics, summed over all workers
    idle_time_ns: AtomicU64,
    busy_time_ns: AtomicU64,
    max_task_ns: AtomicU64,

    start_time: Instant,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self {
            tasks_submitted: AtomicU64::new(0),
            tasks_executed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            tasks_rejected_full: AtomicU64::new(0),
            tasks_rejected_stopping: AtomicU64::new(0),
            producer_waits: AtomicU64::new(0),
            idle_time_ns: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
            max_task_ns: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// A task was accepted into the queue.
    pub fn record_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a task execution with duration
    pub fn record_task_execution(&self, duration_ns: u64) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
        self.max_task_ns.fetch_max(duration_ns, Ordering::Relaxed);
    }

    pub fn record_task_panic(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_full(&self) {
        self.tasks_rejected_full.fetch_add(1, Ordering::Relaxed);
    }

    /// Includes producers released from a full-queue wait by `stop()`.
    pub fn record_rejected_stopping(&self) {
        self.tasks_rejected_stopping.fetch_add(1, Ordering::Relaxed);
    }

    /// A producer had to park on a full queue.
    pub fn record_producer_wait(&self) {
        self.producer_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_idle_time(&self, duration_ns: u64) {
        self.idle_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            tasks_rejected_full: self.tasks_rejected_full.load(Ordering::Relaxed),
            tasks_rejected_stopping: self.tasks_rejected_stopping.load(Ordering::Relaxed),
            producer_waits: self.producer_waits.load(Ordering::Relaxed),
            idle_time_ns: self.idle_time_ns.load(Ordering::Relaxed),
            busy_time_ns: self.busy_time_ns.load(Ordering::Relaxed),
            max_task_ns: self.max_task_ns.load(Ordering::Relaxed),
        }
    }
}

impl Default for PoolMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub tasks_submitted: u64,
    pub tasks_executed: u64,
    pub tasks_panicked: u64,
    pub tasks_rejected_full: u64,
    pub tasks_rejected_stopping: u64,
    pub producer_waits: u64,
    pub idle_time_ns: u64,
    pub busy_time_ns: u64,
    pub max_task_ns: u64,
}

impl MetricsSnapshot {
    /// Calculate overall utilization (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        let total_time = self.idle_time_ns + self.busy_time_ns;
        if total_time == 0 {
            return 0.0;
        }
        self.busy_time_ns as f64 / total_time as f64
    }

    /// Calculate tasks per second
    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.tasks_executed as f64 / seconds
    }

    pub fn avg_task_ns(&self) -> u64 {
        if self.tasks_executed == 0 {
            return 0;
        }
        self.busy_time_ns / self.tasks_executed
    }
}
