mod cli;
mod commands;
mod config;
mod storage;

use std::{io, sync::Arc};

use clap::Parser;
use color_eyre::Result;
use compcreds::CompCredStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Command, ConfigCommand};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command {
        Command::Version => print_version(),
        Command::Config(ConfigCommand::Init) => init_config(&config)?,
        Command::Health => {
            commands::run_health(Arc::new(storage::storage_from_config(&config)?)).await?;
            println!("Storage: ok");
        }
        Command::Creds(cmd) => {
            let root_path = cli.root_path.unwrap_or_else(|| config.root_path.clone());
            let storage = Arc::new(storage::storage_from_config(&config)?);
            let store = CompCredStore::new(root_path, storage);
            commands::handle(cmd, &store, &mut io::stdout().lock()).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters; logs go to stderr so stdout stays parseable.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("compcreds {}", env!("CARGO_PKG_VERSION"));
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
