use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use log::warn;
use sluice_protocol::Record;

use crate::FailoverPolicy;

/// Re-queues failed records into a bounded buffer for the owner to retry.
///
/// When the buffer is full the record is dropped and counted; `deliver`
/// never blocks the completing thread.
#[derive(Debug)]
pub struct RetryQueueFailoverPolicy {
    tx: Sender<Record>,
    rx: Receiver<Record>,
    queued: AtomicU64,
    overflowed: AtomicU64,
}

impl RetryQueueFailoverPolicy {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = channel::bounded(capacity.max(1));
        Self {
            tx,
            rx,
            queued: AtomicU64::new(0),
            overflowed: AtomicU64::new(0),
        }
    }

    /// A handle for consumers that want to block on retried records.
    pub fn receiver(&self) -> Receiver<Record> {
        self.rx.clone()
    }

    /// Take everything currently buffered.
    pub fn drain(&self) -> Vec<Record> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn overflowed(&self) -> u64 {
        self.overflowed.load(Ordering::Relaxed)
    }
}

impl FailoverPolicy for RetryQueueFailoverPolicy {
    fn deliver(&self, record: Record) {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.queued.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(record)) | Err(TrySendError::Disconnected(record)) => {
                let n = self.overflowed.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "[failover] retry queue full, dropping record of {} bytes ({n} dropped so far)",
                    record.len()
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
