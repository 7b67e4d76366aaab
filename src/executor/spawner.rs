//! Thread creation for pool workers.

use super::worker::WorkerId;
use std::io;
use std::thread::{self, JoinHandle};

/// Everything needed to launch one worker thread.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub worker: WorkerId,
    pub name: String,
    pub stack_size: Option<usize>,
}

/// Creates the OS threads backing pool workers.
///
/// The pool calls `spawn` once per worker, in ordinal order, from `start()`.
/// An `Err` aborts startup and triggers rollback of the workers already running.
pub trait ThreadSpawner: Send + Sync {
    fn spawn(
        &self,
        request: SpawnRequest,
        body: Box<dyn FnOnce() + Send + 'static>,
    ) -> io::Result<JoinHandle<()>>;
}

/// Spawns named threads with `std::thread::Builder`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdSpawner;

impl ThreadSpawner for StdSpawner {
    fn spawn(
        &self,
        request: SpawnRequest,
        body: Box<dyn FnOnce() + Send + 'static>,
    ) -> io::Result<JoinHandle<()>> {
        let mut builder = thread::Builder::new().name(request.name);
        if let Some(stack_size) = request.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder.spawn(body)
    }
}
