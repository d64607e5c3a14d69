use std::sync::atomic::{AtomicU64, Ordering};

use sluice_protocol::Record;

use crate::FailoverPolicy;

/// Drops failed records, keeping only a count.
#[derive(Debug, Default)]
pub struct NoopFailoverPolicy {
    dropped: AtomicU64,
}

impl NoopFailoverPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl FailoverPolicy for NoopFailoverPolicy {
    fn deliver(&self, _record: Record) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
