use std::time::Duration;

use reqwest::Url;

use crate::ConfigError;

pub const DEFAULT_MAX_TOTAL_CONNECTION: usize = 40;
pub const DEFAULT_MAX_TOTAL_CONNECTION_PER_ROUTE: usize = 4;
pub const SERVER_URIS_DELIMITER: char = ';';

/// Validated, immutable client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    server_uris: Vec<String>,
    conn_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    max_total_connection: usize,
    default_max_total_connection_per_route: usize,
    discovery_enabled: bool,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Deduplicated endpoints in configuration order.
    pub fn server_uris(&self) -> &[String] {
        &self.server_uris
    }

    /// `None` leaves the HTTP library default in place.
    pub fn conn_timeout(&self) -> Option<Duration> {
        self.conn_timeout
    }

    /// Bound on a whole request, from sending it to reading the last byte of
    /// the response. `None` leaves the HTTP library default in place.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn max_total_connection(&self) -> usize {
        self.max_total_connection
    }

    pub fn default_max_total_connection_per_route(&self) -> usize {
        self.default_max_total_connection_per_route
    }

    pub fn discovery_enabled(&self) -> bool {
        self.discovery_enabled
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    server_uris: Option<String>,
    conn_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    max_total_connection: usize,
    default_max_total_connection_per_route: usize,
    discovery_enabled: bool,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            server_uris: None,
            conn_timeout: None,
            read_timeout: None,
            max_total_connection: DEFAULT_MAX_TOTAL_CONNECTION,
            default_max_total_connection_per_route: DEFAULT_MAX_TOTAL_CONNECTION_PER_ROUTE,
            discovery_enabled: false,
        }
    }
}

impl ClientConfigBuilder {
    /// Semicolon-delimited endpoint list, e.g. `http://a:9200;http://b:9200`.
    pub fn with_server_uris(mut self, server_uris: impl Into<String>) -> Self {
        self.server_uris = Some(server_uris.into());
        self
    }

    pub fn with_conn_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.conn_timeout = timeout.into();
        self
    }

    pub fn with_read_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.read_timeout = timeout.into();
        self
    }

    pub fn with_max_total_connection(mut self, max: usize) -> Self {
        self.max_total_connection = max;
        self
    }

    pub fn with_default_max_total_connection_per_route(mut self, max: usize) -> Self {
        self.default_max_total_connection_per_route = max;
        self
    }

    pub fn with_discovery_enabled(mut self, enabled: bool) -> Self {
        self.discovery_enabled = enabled;
        self
    }

    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let raw = self.server_uris.ok_or(ConfigError::MissingServerUris)?;
        let server_uris = parse_server_uris(&raw)?;

        if self.max_total_connection == 0 {
            return Err(ConfigError::InvalidPoolSize {
                name: "maxTotalConnection",
            });
        }
        if self.default_max_total_connection_per_route == 0 {
            return Err(ConfigError::InvalidPoolSize {
                name: "defaultMaxTotalConnectionPerRoute",
            });
        }

        Ok(ClientConfig {
            server_uris,
            conn_timeout: self.conn_timeout,
            read_timeout: self.read_timeout,
            max_total_connection: self.max_total_connection,
            default_max_total_connection_per_route: self.default_max_total_connection_per_route,
            discovery_enabled: self.discovery_enabled,
        })
    }
}

/// Split, trim, validate and deduplicate a delimited endpoint list.
///
/// Trailing slashes are dropped so `http://a:9200/` and `http://a:9200`
/// count as one endpoint; the first occurrence keeps its position.
fn parse_server_uris(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut uris: Vec<String> = Vec::new();

    for part in raw.split(SERVER_URIS_DELIMITER) {
        let uri = part.trim().trim_end_matches('/');
        if uri.is_empty() {
            continue;
        }

        let url = Url::parse(uri).map_err(|e| ConfigError::InvalidServerUri {
            uri: uri.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidServerUri {
                uri: uri.to_owned(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if !uris.iter().any(|u| u == uri) {
            uris.push(uri.to_owned());
        }
    }

    if uris.is_empty() {
        return Err(ConfigError::EmptyServerUris);
    }
    Ok(uris)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
