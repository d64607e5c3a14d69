use std::process::ExitCode;

use clap::Parser;

mod commands;

use commands::Command;
use sluice_runtime::logging;

#[derive(Debug, Parser)]
#[command(
    name = "sluice",
    version,
    about = "Ship records to a search-indexing cluster in batches",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

fn main() -> ExitCode {
    logging::init().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Ship(args) => commands::ship::run(args),
        Command::Template(args) => commands::template::run(args),
        Command::Spool(args) => commands::spool::run(args),
    }
}
