//! Dedicated worker pool for CPU-bound embedding work.
//!
//! Batch embedding and per-query vectorizer refits are synchronous and can
//! take a while on large corpora. They run on a fixed set of named OS threads
//! so async callers never block the runtime.
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  Async Callers  │────▶│  MPSC Channel   │────▶│ Worker Threads  │
//! │  (tokio tasks)  │     │  (shared rx)    │     │   (N, named)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//!          ▲                                               │
//!          └──────────────── oneshot reply ◀───────────────┘
//! ```

use crate::error::WorkerError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Snapshot of pool activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub queue_depth: usize,
    pub jobs_completed: u64,
    pub jobs_panicked: u64,
}

#[derive(Default)]
struct PoolStatsInner {
    queue_depth: AtomicUsize,
    jobs_completed: AtomicU64,
    jobs_panicked: AtomicU64,
}

/// Fixed-size pool of embedding worker threads.
///
/// Dropping the pool closes the job channel; workers finish their current job
/// and exit.
pub struct WorkerPool {
    tx: mpsc::Sender<Job>,
    workers: usize,
    stats: Arc<PoolStatsInner>,
}

impl WorkerPool {
    /// Spawns `workers` threads (at least one).
    pub fn new(workers: usize) -> Result<Self, WorkerError> {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));
        let stats = Arc::new(PoolStatsInner::default());

        for id in 0..workers {
            let rx = rx.clone();
            let stats = stats.clone();
            thread::Builder::new()
                .name(format!("embed-worker-{}", id))
                .spawn(move || Self::worker_loop(id, rx, stats))
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;
        }

        info!(workers, "Embedding worker pool started");
        Ok(Self { tx, workers, stats })
    }

    fn worker_loop(id: usize, rx: Arc<Mutex<mpsc::Receiver<Job>>>, stats: Arc<PoolStatsInner>) {
        debug!(worker = id, "Worker thread started");
        loop {
            // Hold the lock only while waiting for the next job.
            let next = match rx.lock() {
                Ok(guard) => guard.recv(),
                Err(_) => break,
            };
            match next {
                Ok(job) => {
                    stats.queue_depth.fetch_sub(1, Ordering::Relaxed);
                    job();
                }
                Err(_) => break,
            }
        }
        debug!(worker = id, "Worker channel closed, shutting down");
    }

    /// Runs `f` on a worker thread and awaits its result.
    ///
    /// # Errors
    ///
    /// * `WorkerError::ShutDown` - the pool is gone
    /// * `WorkerError::JobPanicked` - `f` panicked; the worker survives
    pub async fn run<F, T>(&self, f: F) -> Result<T, WorkerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let stats = self.stats.clone();
        let job: Job = Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(f));
            match &outcome {
                Ok(_) => {
                    stats.jobs_completed.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    stats.jobs_panicked.fetch_add(1, Ordering::Relaxed);
                    warn!("Embedding job panicked");
                }
            }
            // Caller may have stopped waiting.
            let _ = reply_tx.send(outcome.map_err(|_| WorkerError::JobPanicked));
        });

        self.stats.queue_depth.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(job).is_err() {
            self.stats.queue_depth.fetch_sub(1, Ordering::Relaxed);
            return Err(WorkerError::ShutDown);
        }

        reply_rx.await.map_err(|_| WorkerError::ShutDown)?
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.workers,
            queue_depth: self.stats.queue_depth.load(Ordering::Relaxed),
            jobs_completed: self.stats.jobs_completed.load(Ordering::Relaxed),
            jobs_panicked: self.stats.jobs_panicked.load(Ordering::Relaxed),
        }
    }
}
