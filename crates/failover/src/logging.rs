use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use sluice_protocol::Record;

use crate::FailoverPolicy;

/// Bytes of payload shown per dropped record.
pub const DEFAULT_PREVIEW_LEN: usize = 256;

/// Logs each failed record at warn level and drops it.
#[derive(Debug)]
pub struct LoggingFailoverPolicy {
    preview_len: usize,
    logged: AtomicU64,
}

impl LoggingFailoverPolicy {
    pub fn new(preview_len: usize) -> Self {
        Self {
            preview_len,
            logged: AtomicU64::new(0),
        }
    }

    pub fn logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }
}

impl Default for LoggingFailoverPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_LEN)
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn preview(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

impl FailoverPolicy for LoggingFailoverPolicy {
    fn deliver(&self, record: Record) {
        self.logged.fetch_add(1, Ordering::Relaxed);

        let shown = preview(record.payload(), self.preview_len);
        let ellipsis = if shown.len() < record.len() { "..." } else { "" };
        warn!(
            "[failover] dropping record for index {}: {shown}{ellipsis}",
            record.index().unwrap_or("<default>"),
        );
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
