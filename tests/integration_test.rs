use crossbeam_channel::{bounded, Receiver, Sender};
use fixpool::prelude::*;
use fixpool::{SpawnRequest, StdSpawner, ThreadSpawner};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

fn started_pool(threads: usize, capacity: usize) -> ThreadPool {
    let config = Config::builder()
        .num_threads(threads)
        .queue_capacity(capacity)
        .build()
        .unwrap();
    let pool = ThreadPool::new(config).unwrap();
    pool.start().unwrap();
    pool
}

/// Occupies one worker until the returned sender is dropped.
fn block_one_worker(pool: &ThreadPool) -> Sender<()> {
    let (started_tx, started_rx) = bounded::<()>(0);
    let (release_tx, release_rx): (Sender<()>, Receiver<()>) = bounded(0);
    pool.submit(move |_| {
        let _ = started_tx.send(());
        let _ = release_rx.recv();
    })
    .unwrap();
    started_rx.recv().unwrap();
    release_tx
}

fn wait_for_blocked_producers(pool: &ThreadPool, n: usize) {
    while pool.blocked_producers() < n {
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_blocking_submit_counts_every_task() {
    let pool = Arc::new(started_pool(10, 30));
    let counter = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    for _ in 0..1000 {
        let counter = counter.clone();
        let max_seen = max_seen.clone();
        let observer = pool.clone();
        pool.submit(move |_| {
            max_seen.fetch_max(observer.queue_len(), Ordering::SeqCst);
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    pool.stop();
    pool.join().unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 1000);
    assert!(max_seen.load(Ordering::SeqCst) <= 30);

    let metrics = pool.metrics();
    assert_eq!(metrics.tasks_submitted, 1000);
    assert_eq!(metrics.tasks_executed, 1000);

    let per_worker: u64 = pool.worker_stats().iter().map(|w| w.tasks_executed).sum();
    assert_eq!(per_worker, 1000);
}

#[test]
fn test_try_submit_rejects_when_full() {
    let pool = started_pool(1, 1);
    let release = block_one_worker(&pool);

    let ran = Arc::new(AtomicUsize::new(0));
    let first = ran.clone();
    pool.try_submit(move |_| {
        first.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    assert_eq!(pool.queue_len(), 1);

    let second = ran.clone();
    let err = pool
        .try_submit(move |_| {
            second.fetch_add(100, Ordering::SeqCst);
        })
        .unwrap_err();
    assert!(err.is_queue_full());
    assert!(matches!(err, SubmitError::QueueFull { capacity: 1, .. }));
    assert_eq!(pool.queue_len(), 1);
    drop(err);

    drop(release);
    pool.stop();
    pool.join().unwrap();

    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(pool.metrics().tasks_rejected_full, 1);
}

struct FailingSpawner {
    fail_at: WorkerId,
    spawned: AtomicUsize,
    exited: Arc<AtomicUsize>,
}

impl ThreadSpawner for FailingSpawner {
    fn spawn(
        &self,
        request: SpawnRequest,
        body: Box<dyn FnOnce() + Send + 'static>,
    ) -> io::Result<JoinHandle<()>> {
        if request.worker == self.fail_at {
            return Err(io::Error::new(io::ErrorKind::Other, "injected spawn failure"));
        }
        self.spawned.fetch_add(1, Ordering::SeqCst);
        let exited = self.exited.clone();
        StdSpawner.spawn(
            request,
            Box::new(move || {
                body();
                exited.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }
}

#[test]
fn test_spawn_failure_rolls_back_started_workers() {
    let spawner = Arc::new(FailingSpawner {
        fail_at: 4,
        spawned: AtomicUsize::new(0),
        exited: Arc::new(AtomicUsize::new(0)),
    });
    let config = Config::builder()
        .num_threads(10)
        .queue_capacity(8)
        .build()
        .unwrap();
    let pool = ThreadPool::with_spawner(config, spawner.clone() as Arc<dyn ThreadSpawner>).unwrap();

    let err = pool.start().unwrap_err();
    match err {
        Error::ThreadCreateFailure {
            worker,
            rolled_back,
            ..
        } => {
            assert_eq!(worker, 4);
            assert_eq!(rolled_back, 4);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(spawner.spawned.load(Ordering::SeqCst), 4);
    assert_eq!(spawner.exited.load(Ordering::SeqCst), 4);
    assert_eq!(pool.state(), PoolState::Joined);

    let stats = pool.worker_stats();
    assert!(stats[..4].iter().all(|w| w.status == WorkerStatus::Stopped));
    assert!(stats[4..].iter().all(|w| w.status == WorkerStatus::Idle));

    assert!(pool.try_submit(|_| {}).unwrap_err().is_stopping());
    pool.join().unwrap();
}

#[test]
fn test_submit_after_stop_is_rejected() {
    let pool = started_pool(2, 4);
    pool.stop();

    let ran = Arc::new(AtomicUsize::new(0));
    let a = ran.clone();
    let b = ran.clone();
    assert!(pool
        .submit(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap_err()
        .is_stopping());
    assert!(pool
        .try_submit(move |_| {
            b.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap_err()
        .is_stopping());

    pool.join().unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(pool.metrics().tasks_rejected_stopping, 2);
}

#[test]
fn test_stop_drains_queued_tasks() {
    let pool = started_pool(1, 16);
    let release = block_one_worker(&pool);

    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..16 {
        let counter = counter.clone();
        pool.try_submit(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    pool.stop();
    assert_eq!(pool.queue_len(), 16);
    drop(release);
    pool.join().unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 16);
    assert_eq!(pool.queue_len(), 0);
}

#[test]
fn test_stop_releases_blocked_producers() {
    let pool = Arc::new(started_pool(1, 1));
    let release = block_one_worker(&pool);
    pool.try_submit(|_| {}).unwrap();

    let ran = Arc::new(AtomicUsize::new(0));
    let producers: Vec<_> = (0..3)
        .map(|_| {
            let pool = pool.clone();
            let ran = ran.clone();
            thread::spawn(move || {
                pool.submit(move |_| {
                    ran.fetch_add(1, Ordering::SeqCst);
                })
            })
        })
        .collect();

    wait_for_blocked_producers(&pool, 3);
    pool.stop();

    for producer in producers {
        let err = producer.join().unwrap().unwrap_err();
        assert!(err.is_stopping());
        let _task = err.into_task();
    }
    assert_eq!(pool.blocked_producers(), 0);

    drop(release);
    pool.join().unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_blocked_producer_resumes_when_space_frees() {
    let pool = Arc::new(started_pool(1, 1));
    let release = block_one_worker(&pool);
    pool.try_submit(|_| {}).unwrap();

    let ran = Arc::new(AtomicUsize::new(0));
    let producer = {
        let pool = pool.clone();
        let ran = ran.clone();
        thread::spawn(move || {
            pool.submit(move |_| {
                ran.fetch_add(1, Ordering::SeqCst);
            })
        })
    };

    wait_for_blocked_producers(&pool, 1);
    drop(release);
    producer.join().unwrap().unwrap();

    pool.stop();
    pool.join().unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert!(pool.metrics().producer_waits >= 1);
}

#[test]
fn test_single_worker_runs_in_fifo_order() {
    let pool = started_pool(1, 8);
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        let order = order.clone();
        pool.submit(move |_| order.lock().push(i)).unwrap();
    }

    pool.stop();
    pool.join().unwrap();
    assert_eq!(*order.lock(), (0..100).collect::<Vec<_>>());
}

#[test]
fn test_many_producers() {
    let pool = started_pool(4, 8);
    let counter = Arc::new(AtomicUsize::new(0));

    thread::scope(|s| {
        for _ in 0..4 {
            let counter = counter.clone();
            let pool = &pool;
            s.spawn(move || {
                for _ in 0..250 {
                    let counter = counter.clone();
                    pool.submit(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
                }
            });
        }
    });

    pool.stop();
    pool.join().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1000);
}

#[test]
fn test_task_with_arg() {
    let pool = started_pool(3, 4);
    let total = Arc::new(AtomicUsize::new(0));

    for n in 1..=10usize {
        let total = total.clone();
        let task = Task::with_arg(
            move |worker: &WorkerContext, n: usize| {
                assert!(worker.id() < 3);
                total.fetch_add(n, Ordering::SeqCst);
            },
            n,
        );
        pool.submit_task(task).unwrap();
    }

    pool.stop();
    pool.join().unwrap();
    assert_eq!(total.load(Ordering::SeqCst), 55);
}

#[test]
fn test_rejected_task_can_be_resubmitted() {
    let pool = started_pool(1, 1);
    let release = block_one_worker(&pool);
    pool.try_submit(|_| {}).unwrap();

    let ran = Arc::new(AtomicUsize::new(0));
    let ran_clone = ran.clone();
    let err = pool
        .try_submit(move |_| {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap_err();
    let task = err.into_task();

    drop(release);
    pool.submit_task(task).unwrap();

    pool.stop();
    pool.join().unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_zero_capacity() {
    let pool = Arc::new(started_pool(1, 0));
    assert!(pool.try_submit(|_| {}).unwrap_err().is_queue_full());

    let producer = {
        let pool = pool.clone();
        thread::spawn(move || pool.submit(|_| {}))
    };
    wait_for_blocked_producers(&pool, 1);
    pool.stop();

    assert!(producer.join().unwrap().unwrap_err().is_stopping());
    pool.join().unwrap();
}

#[test]
fn test_panicking_task_is_reported_by_join() {
    let pool = started_pool(2, 16);
    let counter = Arc::new(AtomicUsize::new(0));

    pool.submit(|_| panic!("boom")).unwrap();
    for _ in 0..10 {
        let counter = counter.clone();
        pool.submit(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    pool.stop();
    let err = pool.join().unwrap_err();
    match err {
        Error::WorkerPanic { message, .. } => assert_eq!(message, "boom"),
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(counter.load(Ordering::SeqCst), 10);
    assert_eq!(pool.metrics().tasks_panicked, 1);

    let stats = pool.worker_stats();
    assert_eq!(
        stats
            .iter()
            .filter(|w| w.status == WorkerStatus::Panicked)
            .count(),
        1
    );
    assert!(stats.iter().all(|w| w.status.is_terminal()));
    assert_eq!(pool.state(), PoolState::Joined);
}

#[test]
fn test_drop_stops_and_drains() {
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let pool = started_pool(2, 64);
        for _ in 0..64 {
            let counter = counter.clone();
            pool.try_submit(move |_| {
                thread::sleep(Duration::from_micros(50));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
    }
    assert_eq!(counter.load(Ordering::SeqCst), 64);
}

#[test]
fn test_cleanup_joins_running_pool() {
    let pool = started_pool(2, 4);
    let counter = Arc::new(AtomicUsize::new(0));
    let c = counter.clone();
    pool.submit(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    pool.cleanup().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_allocation_failure() {
    let config = Config::builder()
        .num_threads(1)
        .queue_capacity(usize::MAX)
        .build()
        .unwrap();
    assert!(matches!(
        ThreadPool::new(config),
        Err(Error::AllocationFailure(_))
    ));
}

#[test]
fn test_workers_terminal_after_join() {
    let pool = started_pool(4, 4);
    for _ in 0..20 {
        pool.submit(|_| {}).unwrap();
    }
    pool.stop();
    pool.join().unwrap();

    assert_eq!(pool.worker_count(), 4);
    assert!(pool
        .worker_stats()
        .iter()
        .all(|w| w.status == WorkerStatus::Stopped));
}
