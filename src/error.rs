use crate::executor::task::Task;
use crate::executor::thread_pool::PoolState;
use crate::executor::worker::WorkerId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    #[error("failed to spawn worker {worker} ({rolled_back} workers rolled back): {source}")]
    ThreadCreateFailure {
        worker: WorkerId,
        rolled_back: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("task queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("pool is stopping")]
    PoolStopping,

    #[error("cannot {operation} while pool is {state}")]
    InvalidState {
        operation: &'static str,
        state: PoolState,
    },

    #[error("worker {worker} panicked: {message}")]
    WorkerPanic { worker: WorkerId, message: String },

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn allocation<S: Into<String>>(msg: S) -> Self {
        Error::AllocationFailure(msg.into())
    }

    pub(crate) fn invalid_state(operation: &'static str, state: PoolState) -> Self {
        Error::InvalidState { operation, state }
    }
}

/// Rejected submission. The task is handed back so the caller can retry or drop it.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("task queue full (capacity {capacity})")]
    QueueFull { capacity: usize, task: Task },

    #[error("pool is stopping")]
    PoolStopping { task: Task },

    #[error("pool has not been started")]
    NotStarted { task: Task },
}

impl SubmitError {
    pub fn is_queue_full(&self) -> bool {
        matches!(self, SubmitError::QueueFull { .. })
    }

    pub fn is_stopping(&self) -> bool {
        matches!(self, SubmitError::PoolStopping { .. })
    }

    /// Take back ownership of the rejected task.
    pub fn into_task(self) -> Task {
        match self {
            SubmitError::QueueFull { task, .. }
            | SubmitError::PoolStopping { task }
            | SubmitError::NotStarted { task } => task,
        }
    }
}

impl From<SubmitError> for Error {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::QueueFull { capacity, .. } => Error::QueueFull { capacity },
            SubmitError::PoolStopping { .. } => Error::PoolStopping,
            SubmitError::NotStarted { .. } => {
                Error::invalid_state("submit", PoolState::Initialized)
            }
        }
    }
}
