mod cli;
mod commands;
mod config;
mod main_lib;
mod provider;

use clap::Parser;

use cli::{Cli, Command};
use config::Config;
use main_lib::{build_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }
    init_tracing();

    let state = build_state(&config).await?;
    tracing::debug!("Using database {}", state.db_path);
    let currency = config.display_currency;

    match args.command {
        Command::Account(command) => commands::account(&state, command).await,
        Command::Analyze(analyze) => commands::analyze(&state, analyze, currency).await,
        Command::Reports(command) => commands::reports(&state, command, currency),
        Command::Overlays(overlays) => commands::overlays(&state, overlays),
        Command::Export(export) => commands::export(&state, export, currency),
    }
}
