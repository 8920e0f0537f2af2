//! Worker pool: N workers pulling tasks from the shared queue.
//!
//! A worker finishes whatever fetch it is in before looking at shutdown;
//! cancellation only stops the next pull. The pool returns once every
//! worker has exited.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use netflood_core::DownloadTask;

use crate::fetcher::{FetchError, Fetcher};

type SharedQueue = Arc<Mutex<mpsc::Receiver<DownloadTask>>>;

/// Per-outcome fetch counts, summed over all workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolTally {
    /// HTTP 200 with the body fully read.
    pub completed: u64,
    /// Any status other than 200. Never logged.
    pub rejected: u64,
    /// Connect, timeout or read errors.
    pub failed: u64,
}

impl PoolTally {
    fn merge(&mut self, other: PoolTally) {
        self.completed += other.completed;
        self.rejected += other.rejected;
        self.failed += other.failed;
    }
}

pub struct WorkerPool {
    workers: usize,
    fetcher: Fetcher,
    shutdown: CancellationToken,
}

impl WorkerPool {
    pub fn new(workers: usize, fetcher: Fetcher, shutdown: CancellationToken) -> Self {
        Self {
            workers,
            fetcher,
            shutdown,
        }
    }

    /// Run all workers against `task_rx` until shutdown or until the queue
    /// is closed and empty.
    pub async fn run(self, task_rx: mpsc::Receiver<DownloadTask>) -> PoolTally {
        let queue: SharedQueue = Arc::new(Mutex::new(task_rx));
        let mut set = JoinSet::new();

        for id in 0..self.workers {
            let worker = Worker {
                id,
                queue: queue.clone(),
                fetcher: self.fetcher.clone(),
                shutdown: self.shutdown.clone(),
            };
            set.spawn(worker.run().in_current_span());
        }
        tracing::info!(workers = self.workers, "worker pool started");

        let mut tally = PoolTally::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(t) => tally.merge(t),
                Err(e) => tracing::error!(error = %e, "worker task panicked"),
            }
        }
        tracing::info!(
            completed = tally.completed,
            failed = tally.failed,
            rejected = tally.rejected,
            "worker pool drained"
        );
        tally
    }
}

struct Worker {
    id: usize,
    queue: SharedQueue,
    fetcher: Fetcher,
    shutdown: CancellationToken,
}

impl Worker {
    async fn run(self) -> PoolTally {
        let mut tally = PoolTally::default();
        loop {
            let task = tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                next = next_task(&self.queue) => match next {
                    Some(task) => task,
                    None => break,
                },
            };

            // Not raced against shutdown: an in-flight fetch always completes.
            match self.fetcher.fetch(&task).await {
                Ok(bytes) => {
                    tally.completed += 1;
                    tracing::info!(worker = self.id, url = %task.url, bytes, "download complete");
                }
                Err(FetchError::Status(_)) => {
                    tally.rejected += 1;
                }
                Err(e) => {
                    tally.failed += 1;
                    tracing::warn!(
                        worker = self.id,
                        url = %task.url,
                        ip = %task.ip,
                        error = %e,
                        "download failed"
                    );
                }
            }
        }
        tracing::debug!(worker = self.id, "worker exiting");
        tally
    }
}

async fn next_task(queue: &SharedQueue) -> Option<DownloadTask> {
    queue.lock().await.recv().await
}
