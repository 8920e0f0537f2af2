//! netflood-core — shared types for the traffic generator.
//! Task lines, daily time windows, the stats wire payload and configuration.

pub mod config;
pub mod stats;
pub mod task;
pub mod timegate;

pub use stats::{bytes_to_mb, StatsPayload};
pub use task::{parse_tasks, DownloadTask};
pub use timegate::{TimeGate, TimeSpecError};
