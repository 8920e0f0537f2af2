//! Stats reporter: periodically POSTs run totals to a stats endpoint.
//!
//! One attempt per tick, no retry. Failures are logged and never touch the run.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use netflood_core::{bytes_to_mb, StatsPayload};

use crate::counter::ByteCounter;

pub const REPORT_PERIOD: Duration = Duration::from_secs(10);
const REPORT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),
    #[error("failed to send report: {0}")]
    Request(reqwest::Error),
    #[error("stats server returned {0}")]
    Status(reqwest::StatusCode),
}

/// Read-only view of a run, as needed for a report.
#[derive(Debug, Clone)]
pub struct ReportSource {
    pub counter: ByteCounter,
    pub started_at: Instant,
    /// Time-window label, e.g. "12:00-13:00" or the always-on label.
    pub window: String,
}

impl ReportSource {
    pub fn payload(&self, name: &str) -> StatsPayload {
        // Floor at one second so an early report doesn't divide by ~0.
        let elapsed = self.started_at.elapsed().as_secs_f64().max(1.0);
        let total = bytes_to_mb(self.counter.get());
        StatsPayload {
            name: name.to_string(),
            speed: total / elapsed,
            total,
            time: self.window.clone(),
        }
    }
}

pub struct StatsReporter {
    api_url: String,
    hostname: String,
    client: reqwest::Client,
}

impl StatsReporter {
    pub fn new(api_url: impl Into<String>) -> Result<Self, ReportError> {
        Self::with_hostname(api_url, local_hostname())
    }

    pub fn with_hostname(
        api_url: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(REPORT_TIMEOUT)
            .build()
            .map_err(ReportError::Client)?;
        Ok(Self {
            api_url: api_url.into(),
            hostname: hostname.into(),
            client,
        })
    }

    /// One POST of `payload`. Any 2xx is success.
    pub async fn report(&self, payload: &StatsPayload) -> Result<(), ReportError> {
        let resp = self
            .client
            .post(&self.api_url)
            .json(payload)
            .send()
            .await
            .map_err(ReportError::Request)?;
        if !resp.status().is_success() {
            return Err(ReportError::Status(resp.status()));
        }
        Ok(())
    }

    /// Report every `period` until shutdown. The first report goes out one
    /// period after start.
    pub async fn run(self, source: ReportSource, period: Duration, shutdown: CancellationToken) {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        tracing::info!(url = %self.api_url, host = %self.hostname, "stats reporting enabled");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("stats reporter stopping");
                    return;
                }

                _ = interval.tick() => {
                    let payload = source.payload(&self.hostname);
                    match self.report(&payload).await {
                        Ok(()) => tracing::info!(
                            host = %payload.name,
                            average = format_args!("{:.2} MB/s", payload.speed),
                            total = format_args!("{:.2} MB", payload.total),
                            window = %payload.time,
                            "stats reported"
                        ),
                        Err(e) => tracing::warn!(url = %self.api_url, error = %e, "stats report failed"),
                    }
                }
            }
        }
    }
}

/// Host name of this machine, "unknown" if it can't be read.
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
