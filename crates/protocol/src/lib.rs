pub mod codec;
mod error;
mod template;

use serde::{Deserialize, Serialize};

pub use error::ProtocolError;
pub use template::IndexTemplate;

/// One unit of work submitted by a producer.
///
/// The payload is the document source as handed to the appender; `index`
/// optionally routes it to a specific index. Records are never mutated once
/// built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    index: Option<String>,
    payload: String,
}

impl Record {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            index: None,
            payload: payload.into(),
        }
    }

    /// Record routed to `index`.
    pub fn routed(index: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            index: Some(index.into()),
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn into_payload(self) -> String {
        self.payload
    }
}

impl From<&str> for Record {
    fn from(payload: &str) -> Self {
        Self::new(payload)
    }
}

impl From<String> for Record {
    fn from(payload: String) -> Self {
        Self::new(payload)
    }
}
