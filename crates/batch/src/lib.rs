mod batch;
mod builder;
mod config;
mod emitter;
mod error;
mod introspector;
mod operations;

pub use batch::{Batch, BatchItem, BatchState};
pub use builder::BatchBuilder;
pub use config::{BatchSettings, DEFAULT_BATCH_SIZE, DEFAULT_DELIVERY_INTERVAL};
pub use emitter::{BatchEmitter, BatchListener, EmitterStats};
pub use error::BatchError;
pub use introspector::{BulkIntrospector, ItemIntrospector};
pub use operations::{BatchOperations, BulkOperations};
