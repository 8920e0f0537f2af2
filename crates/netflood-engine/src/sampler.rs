//! Speed sampler: once per period, turn the byte counter into a sample,
//! log it and overwrite the speed sink with it.

use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use netflood_core::bytes_to_mb;

use crate::counter::ByteCounter;
use crate::sink::SpeedSink;

pub const SAMPLE_PERIOD: Duration = Duration::from_secs(1);
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct SpeedSample {
    pub timestamp: DateTime<Local>,
    /// MB/s over the last period.
    pub instant_mbps: f64,
    /// MB/s since the sampler started.
    pub average_mbps: f64,
    pub total_mb: f64,
}

impl SpeedSample {
    pub fn compute(
        current: u64,
        previous: u64,
        period: Duration,
        elapsed: Duration,
        timestamp: DateTime<Local>,
    ) -> Self {
        let delta = current.saturating_sub(previous);
        Self {
            timestamp,
            instant_mbps: per_second(bytes_to_mb(delta), period),
            average_mbps: per_second(bytes_to_mb(current), elapsed),
            total_mb: bytes_to_mb(current),
        }
    }

    /// The persisted form: one line, newline-terminated.
    pub fn sink_line(&self) -> String {
        format!(
            "{} | 当前速度: {:.2} MB/s | 平均速度: {:.2} MB/s | 总下载: {:.2} MB\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.instant_mbps,
            self.average_mbps,
            self.total_mb
        )
    }
}

fn per_second(mb: f64, over: Duration) -> f64 {
    let secs = over.as_secs_f64();
    if secs > 0.0 {
        mb / secs
    } else {
        0.0
    }
}

pub struct SpeedSampler {
    counter: ByteCounter,
    sink: SpeedSink,
    period: Duration,
    shutdown: CancellationToken,
}

impl SpeedSampler {
    pub fn new(
        counter: ByteCounter,
        sink: SpeedSink,
        period: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            counter,
            sink,
            period,
            shutdown,
        }
    }

    pub async fn run(self) {
        let started = Instant::now();
        let mut interval = tokio::time::interval_at(started + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut previous = 0u64;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::debug!("speed sampler stopping");
                    return;
                }

                _ = interval.tick() => {
                    let current = self.counter.get();
                    let sample = SpeedSample::compute(
                        current,
                        previous,
                        self.period,
                        started.elapsed(),
                        Local::now(),
                    );
                    previous = current;

                    tracing::info!(
                        current = format_args!("{:.2} MB/s", sample.instant_mbps),
                        average = format_args!("{:.2} MB/s", sample.average_mbps),
                        total = format_args!("{:.2} MB", sample.total_mb),
                        "speed"
                    );
                    if let Err(e) = self.sink.overwrite(&sample.sink_line()).await {
                        tracing::warn!(path = %self.sink.path().display(), error = %e, "failed to write speed file");
                    }
                }
            }
        }
    }
}
