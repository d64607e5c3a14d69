mod logging;
mod noop;
mod queue;
mod spool;

use std::sync::Arc;

use sluice_protocol::Record;

pub use logging::{DEFAULT_PREVIEW_LEN, LoggingFailoverPolicy};
pub use noop::NoopFailoverPolicy;
pub use queue::RetryQueueFailoverPolicy;
pub use spool::{SpoolContents, SpoolFailoverPolicy, SpoolReader, clear_spool};

/// Destination for records that could not be indexed.
///
/// Called once per failed record, from whatever thread completed the
/// dispatch. Implementations handle their own errors: `deliver` returns
/// nothing and must not panic.
pub trait FailoverPolicy: Send + Sync {
    fn deliver(&self, record: Record);
}

impl<P: FailoverPolicy + ?Sized> FailoverPolicy for Arc<P> {
    fn deliver(&self, record: Record) {
        (**self).deliver(record)
    }
}

impl<P: FailoverPolicy + ?Sized> FailoverPolicy for Box<P> {
    fn deliver(&self, record: Record) {
        (**self).deliver(record)
    }
}
