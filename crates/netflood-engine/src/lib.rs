//! netflood-engine — the concurrent download engine.
//!
//! A distributor cycles the task set into a bounded queue, a pool of workers
//! drains it with IP-pinned fetches, and a sampler turns the shared byte
//! counter into a persisted speed line once per second.

pub mod counter;
pub mod distributor;
pub mod engine;
pub mod fetcher;
pub mod pool;
pub mod reporter;
pub mod sampler;
pub mod sink;
pub mod source;

pub use counter::ByteCounter;
pub use distributor::Distributor;
pub use engine::{Engine, EngineError, EngineSettings, RunSummary};
pub use fetcher::{Connector, FetchError, Fetcher};
pub use pool::{PoolTally, WorkerPool};
pub use reporter::{ReportError, ReportSource, StatsReporter};
pub use sampler::{SpeedSample, SpeedSampler};
pub use sink::SpeedSink;
pub use source::{SourceError, TaskSource};

pub use tokio_util::sync::CancellationToken;
