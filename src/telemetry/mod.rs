//! Pool counters and timing.
//!
//! Collected with relaxed atomics on the submit and execute paths; read
//! through [`MetricsSnapshot`].

pub mod metrics;

pub use metrics::{MetricsSnapshot, PoolMetrics};
