mod config;
mod dispatcher;
mod error;
mod http;
mod transport;

pub use config::{
    ClientConfig, ClientConfigBuilder, DEFAULT_MAX_TOTAL_CONNECTION,
    DEFAULT_MAX_TOTAL_CONNECTION_PER_ROUTE, SERVER_URIS_DELIMITER,
};
pub use dispatcher::{Dispatcher, FailureHandler, create_result_handler};
pub use error::{BatchFailure, ConfigError, DispatchError, TransportError};
pub use http::{HttpClientFactory, HttpTransport, parse_bulk_response, render_bulk_body};
pub use transport::{
    ClientFactory, Completion, PutTemplate, ResultHandler, TransportClient, TransportResponse,
};
