use sluice_protocol::Record;

use crate::Batch;

/// Recovers the individual records a batch was built from.
pub trait ItemIntrospector: Send + Sync {
    fn items(&self, batch: &Batch) -> Vec<Record>;
}

/// Introspector for batches produced by [`crate::BatchBuilder`].
///
/// Items come back in insertion order with their routing index.
#[derive(Debug, Default, Clone, Copy)]
pub struct BulkIntrospector;

impl ItemIntrospector for BulkIntrospector {
    fn items(&self, batch: &Batch) -> Vec<Record> {
        batch
            .iter()
            .map(|item| match item.index {
                Some(index) => Record::routed(index, item.payload),
                None => Record::new(item.payload),
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "introspector_tests.rs"]
mod tests;
