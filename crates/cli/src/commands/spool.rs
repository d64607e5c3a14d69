use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use clap::{Args, Subcommand};
use log::{error, info, warn};
use sluice_dispatch::Dispatcher;
use sluice_failover::{SpoolReader, clear_spool};
use sluice_runtime::default_spool_path;

use super::{
    ClientArgs, Failover, FailoverKind,
    ship::{delivery_interval, deliver},
};

#[derive(Debug, Args)]
pub struct SpoolArgs {
    /// Spool file (defaults to the state directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub path: Option<PathBuf>,

    #[command(subcommand)]
    pub action: SpoolAction,
}

#[derive(Debug, Subcommand)]
pub enum SpoolAction {
    /// Show spooled records
    List {
        /// Number of records to display
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// Ship spooled records again; records that fail are spooled anew
    Replay {
        #[command(flatten)]
        client: ClientArgs,
    },

    /// Delete the spool file
    Clear,
}

const PREVIEW_LEN: usize = 60;

pub fn run(args: SpoolArgs) -> ExitCode {
    let path = args.path.unwrap_or_else(default_spool_path);

    let result = match args.action {
        SpoolAction::List { limit } => list(&path, limit),
        SpoolAction::Replay { client } => replay(&path, &client),
        SpoolAction::Clear => clear(&path),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("[spool] {e:#}");
            eprintln!("[error] {e:#}");
            ExitCode::from(2)
        }
    }
}

fn list(path: &Path, limit: usize) -> anyhow::Result<ExitCode> {
    let contents = SpoolReader::new(path)
        .read_all()
        .with_context(|| format!("failed to read {}", path.display()))?;

    if contents.records.is_empty() {
        println!("Spool is empty.");
        return Ok(ExitCode::from(0));
    }

    println!("{:<16}  {:>8}  PAYLOAD", "INDEX", "BYTES");
    println!("{}", "-".repeat(72));

    for record in contents.records.iter().take(limit) {
        println!(
            "{:<16}  {:>8}  {}",
            record.index().unwrap_or("-"),
            record.len(),
            preview(record.payload(), PREVIEW_LEN)
        );
    }

    let total = contents.records.len();
    if total > limit {
        println!(
            "\n({} more records, use --limit to show more)",
            total - limit
        );
    }
    if contents.corrupt_tail {
        println!("\n(spool ends in a damaged frame; it is dropped on replay)");
    }

    Ok(ExitCode::from(0))
}

/// Move the spool aside, ship its records, and spool any failures back to
/// the original path.
fn replay(path: &Path, client: &ClientArgs) -> anyhow::Result<ExitCode> {
    let config = client.to_config().context("invalid client options")?;

    let pending = replay_path(path);
    if pending.exists() {
        anyhow::bail!(
            "{} exists from an interrupted replay; move it back or remove it first",
            pending.display()
        );
    }

    match fs::rename(path, &pending) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("Spool is empty.");
            return Ok(ExitCode::from(0));
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to move {}", path.display()));
        }
    }

    let contents = SpoolReader::new(&pending)
        .read_all()
        .with_context(|| format!("failed to read {}", pending.display()))?;
    if contents.corrupt_tail {
        warn!("[spool] dropping damaged tail of {}", pending.display());
    }
    info!("[spool] replaying {} records", contents.records.len());

    let failover = Failover::new(FailoverKind::Spool, Some(path.to_path_buf()));
    let summary = deliver(
        Dispatcher::http(config),
        &failover,
        delivery_interval(0),
        contents.records.into_iter().map(Ok),
    )?;

    if let Failover::Spool(spool) = &failover
        && spool.lost() > 0
    {
        anyhow::bail!(
            "{} records could not be spooled again; keeping {}",
            spool.lost(),
            pending.display()
        );
    }

    clear_spool(&pending).with_context(|| format!("failed to remove {}", pending.display()))?;

    println!(
        "Replayed {} records in {} batches, {} spooled again",
        summary.records, summary.batches, summary.failed
    );
    Ok(ExitCode::from(summary.status()))
}

fn clear(path: &Path) -> anyhow::Result<ExitCode> {
    clear_spool(path).with_context(|| format!("failed to remove {}", path.display()))?;
    println!("Spool cleared");
    Ok(ExitCode::from(0))
}

fn replay_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".replay");
    PathBuf::from(name)
}

fn preview(payload: &str, max: usize) -> String {
    match payload.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &payload[..cut]),
        None => payload.to_owned(),
    }
}

#[cfg(test)]
#[path = "spool_tests.rs"]
mod tests;
