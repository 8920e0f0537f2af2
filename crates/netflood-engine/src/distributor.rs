//! Task distributor: cycles the task set into the shared queue.
//!
//! Tasks go out in list order, wrapping to the first after the last, until
//! shutdown. A full queue blocks the send; that wait is cancelable. Outside
//! the time gate's windows nothing is queued. Dropping the distributor's
//! sender closes the queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use netflood_core::{DownloadTask, TimeGate};

use crate::engine::EngineError;

/// Longest single sleep while waiting for a window, so clock changes and
/// long waits are re-evaluated.
const GATE_RECHECK: Duration = Duration::from_secs(60);

pub struct Distributor {
    tasks: Arc<[DownloadTask]>,
    gate: TimeGate,
    task_tx: mpsc::Sender<DownloadTask>,
    shutdown: CancellationToken,
}

impl Distributor {
    pub fn new(
        tasks: Arc<[DownloadTask]>,
        gate: TimeGate,
        task_tx: mpsc::Sender<DownloadTask>,
        shutdown: CancellationToken,
    ) -> Result<Self, EngineError> {
        if tasks.is_empty() {
            return Err(EngineError::EmptyTaskSet);
        }
        Ok(Self {
            tasks,
            gate,
            task_tx,
            shutdown,
        })
    }

    pub async fn run(self) {
        let mut cycles: u64 = 0;
        loop {
            for task in self.tasks.iter() {
                if !self.wait_for_window().await {
                    tracing::debug!(cycles, "distributor stopping");
                    return;
                }

                tokio::select! {
                    biased;

                    _ = self.shutdown.cancelled() => {
                        tracing::debug!(cycles, "distributor stopping");
                        return;
                    }

                    sent = self.task_tx.send(task.clone()) => {
                        if sent.is_err() {
                            tracing::debug!("task queue closed, distributor exiting");
                            return;
                        }
                    }
                }
            }
            cycles += 1;
        }
    }

    /// Returns once the gate is open, or `false` if shutdown came first.
    async fn wait_for_window(&self) -> bool {
        let mut announced = false;
        loop {
            if self.shutdown.is_cancelled() {
                return false;
            }
            if self.gate.is_in_range_now() {
                if announced {
                    tracing::info!(window = %self.gate, "download window open, resuming");
                }
                return true;
            }

            let wait = self.gate.wait_until_next_now();
            if !announced {
                tracing::info!(
                    window = %self.gate,
                    next_start = %self.gate.next_start_now().format("%H:%M"),
                    wait_mins = wait.as_secs() / 60,
                    "outside download window, pausing"
                );
                announced = true;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => return false,
                _ = tokio::time::sleep(wait.clamp(Duration::from_secs(1), GATE_RECHECK)) => {}
            }
        }
    }
}
