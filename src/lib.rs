//! fixpool - a fixed-size thread pool with a bounded task queue
//!
//! A fixed set of worker threads consumes a bounded FIFO of tasks. Producers
//! either block while the queue is full ([`ThreadPool::submit`]) or get the
//! task handed back ([`ThreadPool::try_submit`]). Shutdown is
//! drain-to-completion: after [`ThreadPool::stop`] no new task is admitted,
//! every task already queued still runs, and [`ThreadPool::join`] returns once
//! all workers have exited.
//!
//! # Quick Start
//!
//! ```no_run
//! use fixpool::prelude::*;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let config = Config::builder().num_threads(10).queue_capacity(30).build()?;
//! let pool = ThreadPool::new(config)?;
//! pool.start()?;
//!
//! let done = Arc::new(AtomicUsize::new(0));
//! for _ in 0..1000 {
//!     let done = done.clone();
//!     pool.submit(move |_worker| {
//!         done.fetch_add(1, Ordering::Relaxed);
//!     })?;
//! }
//!
//! pool.stop();
//! pool.join()?;
//! assert_eq!(done.load(Ordering::Relaxed), 1000);
//! # Ok::<(), fixpool::Error>(())
//! ```
//!
//! # Guarantees
//!
//! - The queue never holds more than `queue_capacity` tasks.
//! - Tasks are dequeued in submission order.
//! - Callbacks run with no pool lock held.
//! - Every task accepted before `stop()` runs exactly once before `join()` returns.
//! - `stop()` releases producers blocked in `submit` with `PoolStopping`.
//!
//! Panics inside a callback are not caught. The worker running it exits and
//! `join()` reports it as [`Error::WorkerPanic`].

#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod telemetry;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result, SubmitError};
pub use executor::{
    PoolState, SpawnRequest, StdSpawner, Task, TaskId, ThreadPool, ThreadSpawner, WorkerContext,
    WorkerId, WorkerSnapshot, WorkerStatus,
};
pub use telemetry::{MetricsSnapshot, PoolMetrics};
