use thiserror::Error;

use crate::TransportResponse;

/// Invalid client configuration, reported by `ClientConfigBuilder::build`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no serverUris provided for the client configuration")]
    MissingServerUris,

    #[error("serverUris contains no endpoint")]
    EmptyServerUris,

    #[error("invalid server uri '{uri}': {reason}")]
    InvalidServerUri { uri: String, reason: String },

    #[error("{name} must be greater than zero")]
    InvalidPoolSize { name: &'static str },
}

/// Failure of a single call through the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("failed to build transport client: {0}")]
    Build(String),

    #[error("transport is shut down")]
    Closed,
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_builder() {
            TransportError::Build(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to create transport client: {0}")]
    ClientInit(#[source] TransportError),

    #[error("failed to start delivery ticker: {0}")]
    Ticker(#[from] std::io::Error),
}

/// Why a dispatched batch is handed to the failover policy. Both causes
/// take the same path; the distinction only shows up in logs.
#[derive(Debug, Error)]
pub enum BatchFailure {
    #[error("indexing service rejected the batch: {0}")]
    Rejected(TransportResponse),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
