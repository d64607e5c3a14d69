use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a batch once it leaves the builder.
///
/// `Open` only exists inside [`crate::BatchBuilder`]; a [`Batch`] value is
/// born `Sealed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BatchState {
    Open = 0,
    Sealed = 1,
    Dispatched = 2,
    Succeeded = 3,
    PartiallyFailed = 4,
    Failed = 5,
}

impl BatchState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => BatchState::Open,
            1 => BatchState::Sealed,
            2 => BatchState::Dispatched,
            3 => BatchState::Succeeded,
            4 => BatchState::PartiallyFailed,
            _ => BatchState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchState::Succeeded | BatchState::PartiallyFailed | BatchState::Failed
        )
    }

    fn can_move_to(self, next: BatchState) -> bool {
        match (self, next) {
            (BatchState::Open, BatchState::Sealed) => true,
            (BatchState::Sealed, BatchState::Dispatched) => true,
            (BatchState::Dispatched, n) => n.is_terminal(),
            _ => false,
        }
    }
}

/// Location of one record inside the batch blob.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Entry {
    /// Slot in `Batch::indices`, if the record was routed.
    pub(crate) index: Option<u32>,
    pub(crate) offset: usize,
    pub(crate) len: usize,
}

/// Borrowed view of one record in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchItem<'a> {
    pub index: Option<&'a str>,
    pub payload: &'a str,
}

/// A sealed, immutable group of records submitted in one bulk call.
///
/// Payloads are interned back to back in a single string and index names in
/// a small table; individual records are only recovered through
/// [`crate::ItemIntrospector`] or [`Batch::iter`].
#[derive(Debug)]
pub struct Batch {
    id: u64,
    capacity: usize,
    blob: String,
    entries: Vec<Entry>,
    indices: Vec<String>,
    state: AtomicU8,
}

impl Batch {
    pub(crate) fn new(
        id: u64,
        capacity: usize,
        blob: String,
        entries: Vec<Entry>,
        indices: Vec<String>,
    ) -> Self {
        Self {
            id,
            capacity,
            blob,
            entries,
            indices,
            state: AtomicU8::new(BatchState::Sealed as u8),
        }
    }

    /// Process-unique sequence number, for logging.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum item count of the builder this batch was sealed from.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total payload bytes.
    pub fn payload_bytes(&self) -> usize {
        self.blob.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = BatchItem<'_>> + '_ {
        self.entries.iter().map(|e| BatchItem {
            index: e.index.map(|slot| self.indices[slot as usize].as_str()),
            payload: &self.blob[e.offset..e.offset + e.len],
        })
    }

    pub fn state(&self) -> BatchState {
        BatchState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move the batch to `next` if the lifecycle allows it.
    ///
    /// Returns false and leaves the state untouched otherwise, so a terminal
    /// state can only be reached once.
    pub fn transition(&self, next: BatchState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if !BatchState::from_u8(current).can_move_to(next) {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}
