use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;

mod cli;
mod commands;
mod config;
mod engine;
mod notifier;

use cli::{Cli, Commands};
use config::Config;

fn setup_logging(config: &Config) -> Result<()> {
    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(config.log_level.level_filter());
    }

    // Warnings must reach the engine's output unless a log file is configured
    match &config.log_file {
        Some(path) => {
            let log_file = Config::expand_path(path);
            if let Some(parent) = log_file.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).context("Failed to create log directory")?;
                }
            }
            let target = Box::new(
                fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&log_file)
                    .context("Failed to open log file")?,
            );
            builder.target(env_logger::Target::Pipe(target));
        }
        None => {
            builder.target(env_logger::Target::Stderr);
        }
    }

    builder.init();

    info!(
        "Log level: {} (from {})",
        config.log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Listen { input } => commands::listen::run(input.as_deref(), config.webhook_url(cli.url.as_deref())),
        Commands::Send { payload, play } => {
            commands::send::run(payload.as_deref(), play, config.webhook_url(cli.url.as_deref()))
        }
        Commands::Config { action } => commands::config::run(action, cli.url.as_deref(), &config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config).context("Failed to setup logging")?;

    info!("Starting json-notifier with config from: {:?}", cli.config);

    run(cli, config).context("Command failed")?;

    Ok(())
}
