use std::time::Duration;

/// Number of records after which a batch is sealed and dispatched.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// How often a partially filled batch is flushed when an interval is set.
pub const DEFAULT_DELIVERY_INTERVAL: Duration = Duration::from_millis(1000);

/// Thresholds every new builder starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    batch_size: usize,
    max_bytes: Option<usize>,
}

impl BatchSettings {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            max_bytes: None,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes.max(1));
        self
    }

    /// Maximum number of records per batch. Always at least 1.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Payload size hint in bytes; reaching it makes the batch ready even
    /// below `batch_size`.
    pub fn max_bytes(&self) -> Option<usize> {
        self.max_bytes
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}
