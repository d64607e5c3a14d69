use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use anyhow::Context;
use clap::Args;
use log::{error, info};
use sluice_batch::{BatchSettings, DEFAULT_BATCH_SIZE, DEFAULT_DELIVERY_INTERVAL};
use sluice_dispatch::Dispatcher;
use sluice_protocol::{IndexTemplate, Record};

use super::{ClientArgs, Failover, FailoverKind};

#[derive(Debug, Args)]
pub struct ShipArgs {
    /// File with one record per line; reads stdin when omitted or "-"
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub client: ClientArgs,

    /// Route every record to this index
    #[arg(long)]
    pub index: Option<String>,

    /// Records per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Seal a batch early once its payload reaches this many bytes
    #[arg(long, value_name = "BYTES")]
    pub max_bytes: Option<usize>,

    /// Flush partial batches this often; 0 disables the timer
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_DELIVERY_INTERVAL.as_millis() as u64)]
    pub delivery_interval_ms: u64,

    /// What happens to records the cluster did not accept
    #[arg(long, value_enum, default_value_t = FailoverKind::Log)]
    pub failover: FailoverKind,

    /// Spool file used by `--failover spool`
    #[arg(long, value_name = "PATH")]
    pub spool_path: Option<PathBuf>,

    /// Install this index template before shipping
    #[arg(long, requires = "template_file")]
    pub template_name: Option<String>,

    /// JSON document for `--template-name`
    #[arg(long, value_name = "PATH", requires = "template_name")]
    pub template_file: Option<PathBuf>,
}

/// Totals for one shipping run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipSummary {
    pub records: u64,
    pub batches: u64,
    pub failed: u64,
}

impl ShipSummary {
    /// 0 when every record landed, 1 when some went to failover.
    pub fn status(&self) -> u8 {
        if self.failed == 0 { 0 } else { 1 }
    }
}

pub fn run(args: ShipArgs) -> ExitCode {
    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            error!("[ship] {e:#}");
            eprintln!("[error] {e:#}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: ShipArgs) -> anyhow::Result<ExitCode> {
    let config = args.client.to_config().context("invalid client options")?;

    let mut settings = BatchSettings::new(args.batch_size);
    if let Some(max_bytes) = args.max_bytes {
        settings = settings.with_max_bytes(max_bytes);
    }
    let dispatcher = Dispatcher::http(config).with_batch_settings(settings);

    if let (Some(name), Some(path)) = (&args.template_name, &args.template_file) {
        let template = IndexTemplate::from_path(name.as_str(), path)?;
        dispatcher.execute(&template);
    }

    let failover = Failover::new(args.failover, args.spool_path.clone());
    let interval = delivery_interval(args.delivery_interval_ms);

    let summary = match args.input.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let records = read_records(BufReader::new(file), args.index.as_deref());
            deliver(dispatcher, &failover, interval, records)?
        }
        _ => {
            let records = read_records(io::stdin().lock(), args.index.as_deref());
            deliver(dispatcher, &failover, interval, records)?
        }
    };

    eprintln!(
        "shipped {} records in {} batches, {} failed over",
        summary.records, summary.batches, summary.failed
    );
    Ok(ExitCode::from(summary.status()))
}

pub fn delivery_interval(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Non-blank lines of `reader` as records, optionally routed to `index`.
pub fn read_records<R: BufRead>(
    reader: R,
    index: Option<&str>,
) -> impl Iterator<Item = io::Result<Record>> {
    reader.lines().filter_map(move |line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(Ok(match index {
            Some(index) => Record::routed(index, line),
            None => Record::new(line),
        })),
        Err(e) => Some(Err(e)),
    })
}

/// Feed `records` through an emitter and wait until every dispatched batch
/// has completed.
pub fn deliver(
    dispatcher: Dispatcher,
    failover: &Failover,
    delivery_interval: Option<Duration>,
    records: impl Iterator<Item = io::Result<Record>>,
) -> anyhow::Result<ShipSummary> {
    let emitter = dispatcher
        .create_emitter(failover.policy(), delivery_interval)
        .context("failed to start the batch emitter")?;

    let mut read_error = None;
    for record in records {
        match record {
            Ok(record) => emitter.add(record),
            Err(e) => {
                read_error = Some(e);
                break;
            }
        }
    }

    emitter.flush();
    let stats = emitter.stats();

    // Dropping the dispatcher after the emitter releases the last client
    // handle, which drains the transport queue.
    drop(emitter);
    drop(dispatcher);

    info!(
        "[ship] {} records in {} batches, {} rejected by the listener",
        stats.records, stats.batches, stats.rejected_batches
    );

    if let Some(e) = read_error {
        return Err(anyhow::Error::new(e).context("failed to read records"));
    }

    Ok(ShipSummary {
        records: stats.records,
        batches: stats.batches,
        failed: failover.failed(),
    })
}

#[cfg(test)]
#[path = "ship_tests.rs"]
mod tests;
