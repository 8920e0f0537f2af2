//! Shared byte counter: every worker adds to it, the sampler and
//! reporter read it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic total of response-body bytes received during a run.
/// Cloning shares the same counter.
#[derive(Debug, Clone, Default)]
pub struct ByteCounter {
    bytes: Arc<AtomicU64>,
}

impl ByteCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}
