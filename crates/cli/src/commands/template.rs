use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Args;
use log::error;
use sluice_dispatch::{Dispatcher, PutTemplate};
use sluice_protocol::IndexTemplate;

use super::ClientArgs;

#[derive(Debug, Args)]
pub struct TemplateArgs {
    /// Template name
    #[arg(long)]
    pub name: String,

    /// JSON document holding the template body
    #[arg(long, value_name = "FILE")]
    pub path: PathBuf,

    #[command(flatten)]
    pub client: ClientArgs,
}

pub fn run(args: TemplateArgs) -> ExitCode {
    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            error!("[template] {e:#}");
            eprintln!("[error] {e:#}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: TemplateArgs) -> anyhow::Result<ExitCode> {
    let template = IndexTemplate::from_path(args.name.as_str(), &args.path)?;
    let config = args.client.to_config().context("invalid client options")?;

    let dispatcher = Dispatcher::http(config);
    let client = dispatcher.create_client()?;

    let response = client
        .execute(&PutTemplate::from(&template))
        .with_context(|| format!("failed to install template {}", template.name()))?;

    if response.is_succeeded() {
        println!("Template {} installed ({})", template.name(), response.status);
        Ok(ExitCode::from(0))
    } else {
        eprintln!("Template {} rejected: {response}", template.name());
        Ok(ExitCode::from(1))
    }
}
