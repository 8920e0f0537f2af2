//! Engine: wires distributor, worker pool and sampler into one run.
//!
//!   Engine::new   rejects an empty task set before anything starts
//!   Engine::run   returns after shutdown, once every worker has finished
//!                 its in-flight fetch, with the summary appended to the sink

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use netflood_core::{bytes_to_mb, DownloadTask, TimeGate};

use crate::counter::ByteCounter;
use crate::distributor::Distributor;
use crate::fetcher::Fetcher;
use crate::pool::{PoolTally, WorkerPool};
use crate::sampler::{SpeedSampler, SAMPLE_PERIOD, TIMESTAMP_FORMAT};
use crate::sink::SpeedSink;

/// Upper bound on concurrent workers; the task queue holds twice this many.
pub const MAX_WORKERS: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no download tasks")]
    EmptyTaskSet,
    #[error("worker count {0} is out of range (1..={MAX_WORKERS})")]
    InvalidWorkerCount(usize),
    #[error("failed to open speed file {0}: {1}")]
    Sink(PathBuf, std::io::Error),
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub workers: usize,
    pub speed_file: PathBuf,
    pub sample_period: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            workers: 12,
            speed_file: PathBuf::from("./speed"),
            sample_period: SAMPLE_PERIOD,
        }
    }
}

/// What a finished run downloaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub total_bytes: u64,
    pub elapsed: Duration,
    pub fetches: PoolTally,
}

impl RunSummary {
    pub fn total_mb(&self) -> f64 {
        bytes_to_mb(self.total_bytes)
    }

    pub fn total_gb(&self) -> f64 {
        self.total_mb() / 1024.0
    }

    pub fn average_mbps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_mb() / secs
        } else {
            0.0
        }
    }

    /// Text appended to the speed sink at the end of a run.
    pub fn sink_lines(&self, timestamp: &str) -> String {
        format!(
            "\n{ts} | ========== 下载结束 ==========\n{ts} | 总下载量: {:.2} MB ({:.2} GB)\n",
            self.total_mb(),
            self.total_gb(),
            ts = timestamp
        )
    }
}

pub struct Engine {
    tasks: Arc<[DownloadTask]>,
    gate: TimeGate,
    settings: EngineSettings,
    counter: ByteCounter,
}

impl Engine {
    pub fn new(
        tasks: Vec<DownloadTask>,
        gate: TimeGate,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        if tasks.is_empty() {
            return Err(EngineError::EmptyTaskSet);
        }
        if settings.workers == 0 || settings.workers > MAX_WORKERS {
            return Err(EngineError::InvalidWorkerCount(settings.workers));
        }
        Ok(Self {
            tasks: tasks.into(),
            gate,
            settings,
            counter: ByteCounter::new(),
        })
    }

    /// Shared byte counter; hand it to anything that reports on the run.
    pub fn counter(&self) -> ByteCounter {
        self.counter.clone()
    }

    /// Run until `shutdown` is cancelled, let in-flight fetches finish, then
    /// append the summary to the speed file.
    pub async fn run(self, shutdown: CancellationToken) -> Result<RunSummary, EngineError> {
        let started = Instant::now();
        let path = self.settings.speed_file.clone();
        let sink = SpeedSink::create(&path)
            .await
            .map_err(|e| EngineError::Sink(path.clone(), e))?;

        // Local token so the sampler also stops if the pool ends on its own.
        let run_token = shutdown.child_token();
        let (task_tx, task_rx) = mpsc::channel(self.settings.workers * 2);

        let distributor =
            Distributor::new(self.tasks.clone(), self.gate.clone(), task_tx, run_token.clone())?;
        let sampler = SpeedSampler::new(
            self.counter.clone(),
            sink.clone(),
            self.settings.sample_period,
            run_token.clone(),
        );
        let pool = WorkerPool::new(
            self.settings.workers,
            Fetcher::new(self.counter.clone()),
            run_token.clone(),
        );

        tracing::info!(
            tasks = self.tasks.len(),
            workers = self.settings.workers,
            window = %self.gate,
            speed_file = %path.display(),
            "download run starting"
        );

        let distributor_task = tokio::spawn(distributor.run().in_current_span());
        let sampler_task = tokio::spawn(sampler.run().in_current_span());

        let fetches = pool.run(task_rx).await;

        run_token.cancel();
        if let Err(e) = distributor_task.await {
            tracing::error!(error = %e, "distributor task failed");
        }
        if let Err(e) = sampler_task.await {
            tracing::error!(error = %e, "speed sampler task failed");
        }

        let summary = RunSummary {
            total_bytes: self.counter.get(),
            elapsed: started.elapsed(),
            fetches,
        };

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        if let Err(e) = sink.append(&summary.sink_lines(&timestamp)).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to write final summary");
        }
        tracing::info!(
            total = format_args!("{:.2} MB ({:.2} GB)", summary.total_mb(), summary.total_gb()),
            average = format_args!("{:.2} MB/s", summary.average_mbps()),
            completed = fetches.completed,
            failed = fetches.failed,
            rejected = fetches.rejected,
            "download run finished"
        );

        Ok(summary)
    }
}
