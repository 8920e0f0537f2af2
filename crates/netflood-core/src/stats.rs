//! Stats report wire payload and byte/unit helpers.

use serde::{Deserialize, Serialize};

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Body of a stats report: `{"name", "speed", "total", "time"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsPayload {
    /// Reporting host name.
    pub name: String,
    /// Average throughput since run start, MB/s.
    pub speed: f64,
    /// Cumulative download, MB.
    pub total: f64,
    /// Active time-window label.
    pub time: String,
}

impl StatsPayload {
    pub fn total_gb(&self) -> f64 {
        self.total / 1024.0
    }
}
