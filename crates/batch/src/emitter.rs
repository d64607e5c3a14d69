use std::{
    io, mem,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam::channel::{self, Sender};
use log::{debug, error, warn};
use sluice_protocol::Record;

use crate::{Batch, BatchBuilder, BatchOperations};

/// Receives every sealed batch. Returns whether the batch was accepted for
/// delivery; it must not wait for the delivery itself.
pub type BatchListener = Arc<dyn Fn(Batch) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterStats {
    pub records: u64,
    pub batches: u64,
    pub rejected_batches: u64,
}

struct EmitterInner {
    builder: Mutex<BatchBuilder>,
    operations: Arc<dyn BatchOperations>,
    listener: BatchListener,
    records: AtomicU64,
    batches: AtomicU64,
    rejected_batches: AtomicU64,
}

impl EmitterInner {
    fn lock(&self) -> MutexGuard<'_, BatchBuilder> {
        // A poisoned lock still guards a consistent builder.
        self.builder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seal the current builder and put a fresh one in its place. An empty
    /// builder is left alone.
    fn rotate(&self, builder: &mut BatchBuilder) -> Option<Batch> {
        if builder.is_empty() {
            return None;
        }
        let fresh = self.operations.create_batch_builder();
        let mut full = mem::replace(builder, fresh);
        match full.seal() {
            Ok(batch) => Some(batch),
            Err(e) => {
                error!("[emitter] failed to seal batch: {e}");
                None
            }
        }
    }

    fn add(&self, record: Record) {
        let mut sealed = Vec::new();
        {
            let mut builder = self.lock();

            if builder.is_full() {
                sealed.extend(self.rotate(&mut builder));
            }

            match builder.add(record) {
                Ok(()) => {
                    self.records.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => error!("[emitter] fresh builder rejected record: {e}"),
            }

            if builder.is_ready() {
                sealed.extend(self.rotate(&mut builder));
            }
        }

        for batch in sealed {
            self.notify(batch);
        }
    }

    fn flush(&self) {
        let sealed = {
            let mut builder = self.lock();
            self.rotate(&mut builder)
        };

        if let Some(batch) = sealed {
            self.notify(batch);
        }
    }

    /// Runs outside the builder lock so other producers keep filling the
    /// next batch while this one is handed over.
    fn notify(&self, batch: Batch) {
        let id = batch.id();
        let len = batch.len();

        self.batches.fetch_add(1, Ordering::Relaxed);
        if (self.listener)(batch) {
            debug!("[emitter] batch {id} with {len} records handed to listener");
        } else {
            self.rejected_batches.fetch_add(1, Ordering::Relaxed);
            warn!("[emitter] listener rejected batch {id} with {len} records");
        }
    }
}

struct Ticker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Front end producers write records into.
///
/// Records accumulate in a single builder. The producer whose record fills
/// it seals the batch, swaps in a new builder and passes the sealed batch to
/// the listener; everyone else only ever sees the open builder, so each
/// record lands in exactly one batch.
pub struct BatchEmitter {
    inner: Arc<EmitterInner>,
    ticker: Option<Ticker>,
}

impl BatchEmitter {
    pub fn new(operations: Arc<dyn BatchOperations>, listener: BatchListener) -> Self {
        let builder = operations.create_batch_builder();
        Self {
            inner: Arc::new(EmitterInner {
                builder: Mutex::new(builder),
                operations,
                listener,
                records: AtomicU64::new(0),
                batches: AtomicU64::new(0),
                rejected_batches: AtomicU64::new(0),
            }),
            ticker: None,
        }
    }

    /// Emitter that also flushes partially filled batches every `interval`.
    pub fn with_delivery_interval(
        operations: Arc<dyn BatchOperations>,
        listener: BatchListener,
        interval: Duration,
    ) -> io::Result<Self> {
        let mut emitter = Self::new(operations, listener);

        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let ticks = channel::tick(interval);
        let inner = Arc::clone(&emitter.inner);

        let handle = thread::Builder::new()
            .name("sluice-emitter-tick".into())
            .spawn(move || {
                loop {
                    channel::select! {
                        recv(ticks) -> _ => inner.flush(),
                        recv(stop_rx) -> _ => break,
                    }
                }
            })?;

        emitter.ticker = Some(Ticker {
            stop: stop_tx,
            handle,
        });
        Ok(emitter)
    }

    /// Accept one record. Never blocks on delivery.
    pub fn add(&self, record: Record) {
        self.inner.add(record);
    }

    /// Seal and hand over the current batch if it holds anything.
    pub fn flush(&self) {
        self.inner.flush();
    }

    pub fn stats(&self) -> EmitterStats {
        EmitterStats {
            records: self.inner.records.load(Ordering::Relaxed),
            batches: self.inner.batches.load(Ordering::Relaxed),
            rejected_batches: self.inner.rejected_batches.load(Ordering::Relaxed),
        }
    }
}

impl Drop for BatchEmitter {
    fn drop(&mut self) {
        if let Some(Ticker { stop, handle }) = self.ticker.take() {
            // Disconnecting the stop channel wakes the ticker's select.
            drop(stop);
            if handle.join().is_err() {
                error!("[emitter] delivery ticker thread panicked");
            }
        }
        self.inner.flush();
    }
}

#[cfg(test)]
#[path = "emitter_tests.rs"]
mod tests;
