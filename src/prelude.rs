pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result, SubmitError};
pub use crate::executor::{PoolState, Task, ThreadPool, WorkerContext, WorkerId, WorkerStatus};
pub use crate::telemetry::MetricsSnapshot;
