use sluice_protocol::Record;

use crate::{BatchBuilder, BatchSettings};

/// Factory for batch items and builders, handed to the emitter by the
/// dispatcher so both agree on the batch representation.
pub trait BatchOperations: Send + Sync {
    fn create_batch_item(&self, index: &str, source: String) -> Record;

    fn create_batch_builder(&self) -> BatchBuilder;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BulkOperations {
    settings: BatchSettings,
}

impl BulkOperations {
    pub fn new(settings: BatchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> BatchSettings {
        self.settings
    }
}

impl BatchOperations for BulkOperations {
    fn create_batch_item(&self, index: &str, source: String) -> Record {
        Record::routed(index, source)
    }

    fn create_batch_builder(&self) -> BatchBuilder {
        BatchBuilder::new(self.settings)
    }
}
