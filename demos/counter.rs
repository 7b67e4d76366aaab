//! Submits 1000 tasks through a 10-worker pool with a 30-slot queue and
//! checks that every one of them ran.
//!
//! ```text
//! RUST_LOG=fixpool=debug cargo run --example counter
//! ```

use fixpool::prelude::*;
use parking_lot::Mutex;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const TASK_NUM: usize = 1000;

struct TaskArg {
    cnt: usize,
}

fn run() -> Result<usize> {
    let config = Config::builder()
        .num_threads(10)
        .queue_capacity(30)
        .build()?;

    let pool = ThreadPool::new(config)?;
    pool.start()?;

    let total = Arc::new(Mutex::new(0usize));
    for cnt in 0..TASK_NUM {
        let total = total.clone();
        let task = Task::with_arg(
            move |worker: &WorkerContext, arg: TaskArg| {
                println!("task: {} (worker {})", arg.cnt, worker.id());
                *total.lock() += 1;
            },
            TaskArg { cnt },
        );
        pool.submit_task(task)?;
    }

    pool.stop();
    pool.join()?;

    let metrics = pool.metrics();
    tracing::info!(
        executed = metrics.tasks_executed,
        producer_waits = metrics.producer_waits,
        utilization = metrics.utilization(),
        "pool finished"
    );
    pool.cleanup()?;

    let done = *total.lock();
    Ok(done)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(done) if done == TASK_NUM => ExitCode::SUCCESS,
        Ok(done) => {
            eprintln!("error task not finished: {}/{}", done, TASK_NUM);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
