pub mod ship;
pub mod spool;
pub mod template;

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Args, Subcommand, ValueEnum};
use sluice_dispatch::{
    ClientConfig, ConfigError, DEFAULT_MAX_TOTAL_CONNECTION,
    DEFAULT_MAX_TOTAL_CONNECTION_PER_ROUTE,
};
use sluice_failover::{
    FailoverPolicy, LoggingFailoverPolicy, NoopFailoverPolicy, SpoolFailoverPolicy,
};
use sluice_runtime::default_spool_path;

pub use ship::ShipArgs;
pub use spool::SpoolArgs;
pub use template::TemplateArgs;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read records (one per line) and ship them in batches.
    ///
    /// Example:
    ///   sluice ship --server-uris http://localhost:9200 --index logs app.ndjson
    ///   tail -f app.ndjson | sluice ship --server-uris 'http://a:9200;http://b:9200'
    Ship(ShipArgs),

    /// Install an index template.
    Template(TemplateArgs),

    /// Inspect, replay or clear the failover spool.
    Spool(SpoolArgs),
}

/// Connection options shared by every command that talks to the cluster.
#[derive(Debug, Args)]
pub struct ClientArgs {
    /// Semicolon-separated list of server URIs
    #[arg(long, value_name = "URIS")]
    pub server_uris: String,

    /// Connect timeout in milliseconds (library default when unset)
    #[arg(long, value_name = "MS")]
    pub conn_timeout_ms: Option<u64>,

    /// Whole-request timeout in milliseconds, response read included
    /// (library default when unset)
    #[arg(long, value_name = "MS")]
    pub read_timeout_ms: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_MAX_TOTAL_CONNECTION)]
    pub max_total_connection: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_TOTAL_CONNECTION_PER_ROUTE)]
    pub max_connection_per_route: usize,

    /// Ask the transport to discover cluster nodes
    #[arg(long)]
    pub discovery: bool,
}

impl ClientArgs {
    pub fn to_config(&self) -> Result<ClientConfig, ConfigError> {
        ClientConfig::builder()
            .with_server_uris(self.server_uris.as_str())
            .with_conn_timeout(self.conn_timeout_ms.map(Duration::from_millis))
            .with_read_timeout(self.read_timeout_ms.map(Duration::from_millis))
            .with_max_total_connection(self.max_total_connection)
            .with_default_max_total_connection_per_route(self.max_connection_per_route)
            .with_discovery_enabled(self.discovery)
            .build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailoverKind {
    /// Drop failed records
    Noop,
    /// Log failed records at warn level
    Log,
    /// Persist failed records to the spool file
    Spool,
}

/// The configured failover policy, keeping the concrete type around for the
/// summary counters.
pub enum Failover {
    Noop(Arc<NoopFailoverPolicy>),
    Log(Arc<LoggingFailoverPolicy>),
    Spool(Arc<SpoolFailoverPolicy>),
}

impl Failover {
    pub fn new(kind: FailoverKind, spool_path: Option<PathBuf>) -> Self {
        match kind {
            FailoverKind::Noop => Failover::Noop(Arc::new(NoopFailoverPolicy::new())),
            FailoverKind::Log => Failover::Log(Arc::new(LoggingFailoverPolicy::default())),
            FailoverKind::Spool => Failover::Spool(Arc::new(SpoolFailoverPolicy::new(
                spool_path.unwrap_or_else(default_spool_path),
            ))),
        }
    }

    pub fn policy(&self) -> Arc<dyn FailoverPolicy> {
        match self {
            Failover::Noop(p) => p.clone(),
            Failover::Log(p) => p.clone(),
            Failover::Spool(p) => p.clone(),
        }
    }

    /// Records handed to the policy so far.
    pub fn failed(&self) -> u64 {
        match self {
            Failover::Noop(p) => p.dropped(),
            Failover::Log(p) => p.logged(),
            Failover::Spool(p) => p.written() + p.lost(),
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
