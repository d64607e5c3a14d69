use std::{
    mem,
    sync::atomic::{AtomicU64, Ordering},
};

use hashbrown::HashMap;
use sluice_protocol::Record;

use crate::{
    BatchSettings,
    batch::{Batch, BatchState, Entry},
    error::BatchError,
};

static NEXT_BATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Accumulates records into a [`Batch`].
///
/// Pure in-memory bookkeeping: payloads are appended to one string blob and
/// routing index names are interned. Every record can be recovered from the
/// sealed batch byte for byte.
#[derive(Debug)]
pub struct BatchBuilder {
    settings: BatchSettings,
    state: BatchState,
    blob: String,
    entries: Vec<Entry>,
    indices: Vec<String>,
    index_map: HashMap<String, u32>,
}

impl BatchBuilder {
    pub fn new(settings: BatchSettings) -> Self {
        Self {
            settings,
            state: BatchState::Open,
            blob: String::new(),
            entries: Vec::with_capacity(settings.batch_size().min(4096)),
            indices: Vec::new(),
            index_map: HashMap::new(),
        }
    }

    pub fn with_capacity(batch_size: usize) -> Self {
        Self::new(BatchSettings::new(batch_size))
    }

    pub fn settings(&self) -> BatchSettings {
        self.settings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.state == BatchState::Sealed
    }

    /// True once the builder holds `batch_size` records.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.settings.batch_size()
    }

    pub fn add(&mut self, record: Record) -> Result<(), BatchError> {
        if self.is_sealed() || self.is_full() {
            return Err(BatchError::CapacityExceeded {
                capacity: self.settings.batch_size(),
                sealed: self.is_sealed(),
            });
        }

        let index = record.index().map(|name| self.intern_index(name));

        let offset = self.blob.len();
        self.blob.push_str(record.payload());

        self.entries.push(Entry {
            index,
            offset,
            len: record.len(),
        });

        Ok(())
    }

    /// Whether the open batch reached its item count or size hint.
    pub fn is_ready(&self) -> bool {
        if self.is_sealed() {
            return false;
        }
        self.is_full()
            || self
                .settings
                .max_bytes()
                .is_some_and(|max| self.blob.len() >= max)
    }

    /// Close the builder and hand out its batch.
    ///
    /// The builder stays sealed until [`BatchBuilder::reset`]; sealing twice
    /// is an error.
    pub fn seal(&mut self) -> Result<Batch, BatchError> {
        if self.is_sealed() {
            return Err(BatchError::IllegalState("batch already sealed"));
        }
        self.state = BatchState::Sealed;
        self.index_map.clear();

        Ok(Batch::new(
            NEXT_BATCH_ID.fetch_add(1, Ordering::Relaxed),
            self.settings.batch_size(),
            mem::take(&mut self.blob),
            mem::take(&mut self.entries),
            mem::take(&mut self.indices),
        ))
    }

    /// Drop any accumulated records and reopen the builder.
    pub fn reset(&mut self) {
        self.state = BatchState::Open;
        self.blob.clear();
        self.entries.clear();
        self.indices.clear();
        self.index_map.clear();
    }

    fn intern_index(&mut self, name: &str) -> u32 {
        if let Some(slot) = self.index_map.get(name) {
            return *slot;
        }
        let slot = self.indices.len() as u32;
        self.indices.push(name.to_owned());
        self.index_map.insert(name.to_owned(), slot);
        slot
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
