//! K65 Plus lighting daemon
//!
//! Main entry point: configuration, logging and command dispatch.

mod cli;
mod commands;
mod config;
mod layouts;
mod sensors;
mod store;
mod volume;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use cli::{Cli, Commands};
use config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)?;

    // RUST_LOG wins over the flag, the flag over the config file
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.daemon.log_level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    debug!("Config from {:?}", config_path);

    let serial = cli.serial.as_deref();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(&config, serial),
        Commands::List { json } => commands::query::list(&config.device, json),
        Commands::Effects { model } => commands::query::effects(&config.device, model.as_deref()),
        Commands::Info => commands::query::info(&config.device, serial),
        Commands::InitConfig { force } => {
            if config_path.exists() && !force {
                anyhow::bail!("{} exists, use --force to replace it", config_path.display());
            }
            Config::default().save(&config_path)?;
            println!("Wrote {}", config_path.display());
            Ok(())
        }
    }
}
