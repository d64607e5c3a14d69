use std::{fmt, sync::Arc};

use sluice_batch::{Batch, BatchState};
use sluice_protocol::IndexTemplate;

use crate::{ClientConfig, TransportError};

/// Outcome of a call that reached the indexing service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportResponse {
    pub status: u16,
    /// The service flagged at least one item as failed.
    pub errors: bool,
    /// Items the service reported as failed, when it says.
    pub failed_items: usize,
    pub error_message: Option<String>,
}

impl TransportResponse {
    pub fn ok(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn is_succeeded(&self) -> bool {
        (200..300).contains(&self.status) && !self.errors
    }

    /// Terminal state of a batch of `total` items that got this response.
    pub fn batch_state(&self, total: usize) -> BatchState {
        if self.is_succeeded() {
            BatchState::Succeeded
        } else if self.failed_items > 0 && self.failed_items < total {
            BatchState::PartiallyFailed
        } else {
            BatchState::Failed
        }
    }
}

impl fmt::Display for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.status)?;
        if self.failed_items > 0 {
            write!(f, ", {} failed items", self.failed_items)?;
        }
        if let Some(msg) = &self.error_message {
            write!(f, ", {msg}")?;
        }
        Ok(())
    }
}

/// The single completion event of an asynchronous batch call.
#[derive(Debug)]
pub enum Completion {
    Completed(TransportResponse),
    Failed(TransportError),
}

/// Invoked exactly once per `execute_async`, usually on a transport thread.
pub type ResultHandler = Box<dyn FnOnce(Completion) + Send + 'static>;

/// Template installation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutTemplate {
    pub name: String,
    pub source: String,
}

impl From<&IndexTemplate> for PutTemplate {
    fn from(t: &IndexTemplate) -> Self {
        Self {
            name: t.name().to_owned(),
            source: t.source().to_owned(),
        }
    }
}

/// Client for the remote indexing service.
pub trait TransportClient: Send + Sync {
    /// Submit `batch` and return without waiting. `handler` must be called
    /// exactly once, whatever happens to the request.
    fn execute_async(&self, batch: Arc<Batch>, handler: ResultHandler);

    /// Blocking template installation.
    fn execute(&self, action: &PutTemplate) -> Result<TransportResponse, TransportError>;
}

/// Builds the transport client from the validated configuration.
pub trait ClientFactory: Send + Sync {
    fn build(&self, config: &ClientConfig) -> Result<Arc<dyn TransportClient>, TransportError>;
}
