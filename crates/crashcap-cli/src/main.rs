mod cache;
mod command;
mod shell;

use anyhow::{Context, Result};
use clap::Parser;
use crashcap_core::{Config, VERSION};
use shell::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// CrashCap - interactive Linux memory & process console
#[derive(Parser, Debug)]
#[command(name = "crashcap")]
#[command(version = VERSION)]
#[command(about = "CrashCap - Linux memory & process toolkit", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "crashcap.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_target(false)
        .init();

    // A broken config fails fast with a non-zero exit, before any
    // monitoring can start
    let config = Config::load_or_default(&cli.config).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    Shell::new(config).run().await
}
