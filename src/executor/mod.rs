//! Task execution infrastructure.
//!
//! This module provides the bounded task queue, the shared lock and condition
//! variables, the worker loop and the [`ThreadPool`] that owns them.

mod panic;
pub(crate) mod queue;
pub(crate) mod shared;
pub mod spawner;
pub mod task;
pub mod thread_pool;
pub mod worker;

pub use spawner::{SpawnRequest, StdSpawner, ThreadSpawner};
pub use task::{Task, TaskId, WorkerContext};
pub use thread_pool::{PoolState, ThreadPool};
pub use worker::{WorkerId, WorkerSnapshot, WorkerStatus};
