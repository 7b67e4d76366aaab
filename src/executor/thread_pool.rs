use super::panic::panic_message;
use super::shared::Shared;
use super::spawner::{SpawnRequest, StdSpawner, ThreadSpawner};
use super::task::{Task, WorkerContext};
use super::worker::{Worker, WorkerId, WorkerSnapshot};
use crate::config::Config;
use crate::error::{Error, Result, SubmitError};
use crate::telemetry::MetricsSnapshot;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, warn};

#[cfg(target_os = "linux")]
fn pin_thread_to_core(core_id: usize) {
    // SAFETY: cpuset is a plain bitmask owned by this frame; pid 0 targets the calling thread.
    let result = unsafe {
        let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core_id, &mut cpuset);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &cpuset)
    };
    if result != 0 {
        warn!(
            thread = std::thread::current().name().unwrap_or("unknown"),
            core_id, "failed to pin worker to core"
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn pin_thread_to_core(core_id: usize) {
    warn!(core_id, "worker pinning is only supported on linux");
}

/// Lifecycle of a [`ThreadPool`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PoolState {
    /// Allocated, no worker threads yet.
    Initialized,
    Running,
    /// `stop()` was called; workers drain the queue and exit.
    Stopping,
    /// Every worker thread has been joined.
    Joined,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Initialized => "initialized",
            PoolState::Running => "running",
            PoolState::Stopping => "stopping",
            PoolState::Joined => "joined",
        };
        f.write_str(name)
    }
}

struct WorkerHandle {
    id: WorkerId,
    thread: JoinHandle<()>,
}

/// Fixed set of worker threads consuming a bounded FIFO of tasks.
///
/// ```no_run
/// use fixpool::{Config, ThreadPool};
///
/// let config = Config::builder().num_threads(4).queue_capacity(64).build()?;
/// let pool = ThreadPool::new(config)?;
/// pool.start()?;
///
/// pool.submit(|worker| println!("hello from worker {}", worker.id()))?;
///
/// pool.stop();
/// pool.join()?;
/// # Ok::<(), fixpool::Error>(())
/// ```
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<Arc<Worker>>,
    handles: Mutex<Vec<WorkerHandle>>,
    spawner: Arc<dyn ThreadSpawner>,
    config: Config,
}

impl ThreadPool {
    /// Allocate worker records and the task queue. No threads are started.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_spawner(config, Arc::new(StdSpawner))
    }

    pub fn with_spawner(config: Config, spawner: Arc<dyn ThreadSpawner>) -> Result<Self> {
        config.validate()?;
        let num_threads = config.worker_threads();
        if num_threads == 0 {
            return Err(Error::config("need at least 1 thread"));
        }

        let mut workers = Vec::new();
        workers
            .try_reserve_exact(num_threads)
            .map_err(|e| Error::allocation(format!("{} worker records: {}", num_threads, e)))?;
        for id in 0..num_threads {
            let name = format!("{}-{}", config.thread_name_prefix, id);
            workers.push(Arc::new(Worker::new(id, name)));
        }

        let mut handles = Vec::new();
        handles
            .try_reserve_exact(num_threads)
            .map_err(|e| Error::allocation(format!("{} worker handles: {}", num_threads, e)))?;

        let shared = Arc::new(Shared::new(config.queue_capacity)?);

        debug!(
            workers = num_threads,
            queue_capacity = config.queue_capacity,
            "pool initialized"
        );

        Ok(Self {
            shared,
            workers,
            handles: Mutex::new(handles),
            spawner,
            config,
        })
    }

    /// Spawn every worker thread.
    ///
    /// If a spawn fails, the pool stops, joins the workers already spawned and
    /// ends up `Joined`; the returned error says how many were rolled back.
    pub fn start(&self) -> Result<()> {
        {
            let mut inner = self.shared.lock();
            if inner.state != PoolState::Initialized {
                return Err(Error::invalid_state("start", inner.state));
            }
            inner.state = PoolState::Running;
        }

        let mut handles = self.handles.lock();
        for worker in &self.workers {
            let request = SpawnRequest {
                worker: worker.id,
                name: worker.name.clone(),
                stack_size: self.config.stack_size,
            };

            let body = {
                let worker = worker.clone();
                let shared = self.shared.clone();
                let pin_workers = self.config.pin_workers;
                Box::new(move || {
                    if pin_workers {
                        pin_thread_to_core(worker.id % num_cpus::get());
                    }
                    worker.run(&shared);
                })
            };

            match self.spawner.spawn(request, body) {
                Ok(thread) => handles.push(WorkerHandle {
                    id: worker.id,
                    thread,
                }),
                Err(source) => {
                    error!(worker = worker.id, error = %source, "error creating worker thread");

                    self.shared.stop();
                    let rolled_back = handles.len();
                    for handle in handles.drain(..) {
                        if handle.thread.join().is_err() {
                            warn!(worker = handle.id, "worker panicked during rollback");
                        }
                    }
                    self.shared.lock().state = PoolState::Joined;

                    return Err(Error::ThreadCreateFailure {
                        worker: worker.id,
                        rolled_back,
                        source,
                    });
                }
            }
        }

        debug!(workers = handles.len(), "pool started");
        Ok(())
    }

    /// Submit without blocking. Fails with `QueueFull` when `capacity` tasks
    /// are already pending.
    pub fn try_submit<F>(&self, f: F) -> std::result::Result<(), SubmitError>
    where
        F: FnOnce(&WorkerContext) + Send + 'static,
    {
        self.try_submit_task(Task::new(f))
    }

    pub fn try_submit_task(&self, task: Task) -> std::result::Result<(), SubmitError> {
        self.shared.try_enqueue(task)
    }

    /// Submit, blocking while the queue is full.
    ///
    /// Returns `PoolStopping` if the pool is stopping on entry, or if `stop()`
    /// is called while this producer is waiting for space.
    pub fn submit<F>(&self, f: F) -> std::result::Result<(), SubmitError>
    where
        F: FnOnce(&WorkerContext) + Send + 'static,
    {
        self.submit_task(Task::new(f))
    }

    pub fn submit_task(&self, task: Task) -> std::result::Result<(), SubmitError> {
        self.shared.enqueue(task)
    }

    /// Stop admitting tasks and wake every waiter. Does not wait for workers;
    /// queued tasks still run. Idempotent.
    pub fn stop(&self) {
        if self.shared.stop() {
            debug!(pending = self.queue_len(), "pool stopping");
        }
    }

    /// Block until every worker thread has exited.
    ///
    /// Workers only exit once the queue is empty and the pool is stopping, so
    /// this returns in bounded time only after `stop()`. A worker unwound by a
    /// panicking callback is reported as `WorkerPanic` after all workers are joined.
    pub fn join(&self) -> Result<()> {
        let state = self.state();
        if state == PoolState::Initialized {
            return Err(Error::invalid_state("join", state));
        }

        let mut handles = self.handles.lock();
        let mut first_panic = None;
        let current = std::thread::current().id();
        for handle in handles.drain(..) {
            if handle.thread.thread().id() == current {
                warn!(worker = handle.id, "join called from its own worker, detaching it");
                continue;
            }
            if let Err(payload) = handle.thread.join() {
                let message = panic_message(payload.as_ref());
                error!(worker = handle.id, %message, "worker panicked");
                first_panic.get_or_insert(Error::WorkerPanic {
                    worker: handle.id,
                    message,
                });
            }
        }

        // no worker is left to run anything
        self.shared.stop();
        let newly_joined = {
            let mut inner = self.shared.lock();
            let changed = inner.state != PoolState::Joined;
            inner.state = PoolState::Joined;
            changed
        };
        if newly_joined {
            debug!("pool joined");
        }

        match first_panic {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Release the pool. A pool that is still running is stopped and joined first.
    pub fn cleanup(self) -> Result<()> {
        let result = match self.state() {
            PoolState::Running | PoolState::Stopping => {
                self.stop();
                self.join()
            }
            PoolState::Initialized | PoolState::Joined => Ok(()),
        };
        debug!("pool cleaned up");
        result
    }

    pub fn state(&self) -> PoolState {
        self.shared.lock().state
    }

    pub fn is_stopping(&self) -> bool {
        self.shared.lock().stopping
    }

    /// Tasks queued and not yet picked up by a worker.
    pub fn queue_len(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.config.queue_capacity
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Producers currently parked in `submit` waiting for space.
    pub fn blocked_producers(&self) -> usize {
        self.shared.lock().blocked_producers
    }

    pub fn worker_stats(&self) -> Vec<WorkerSnapshot> {
        self.workers.iter().map(|w| w.snapshot()).collect()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("state", &self.state())
            .field("workers", &self.workers.len())
            .field("capacity", &self.config.queue_capacity)
            .finish_non_exhaustive()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if matches!(self.state(), PoolState::Running | PoolState::Stopping) {
            self.stop();
            if let Err(e) = self.join() {
                warn!(error = %e, "error joining workers on drop");
            }
        }
    }
}
