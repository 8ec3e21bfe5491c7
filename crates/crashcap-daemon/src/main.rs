use anyhow::Result;
use clap::{Parser, Subcommand};
use crashcap_core::{
    notifier_from_config, start_monitor, Config, LogConfig, MemoryPressure, Sampler, SwapStatus,
    SystemSampler, VERSION,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CrashCap Daemon - headless memory monitor
///
/// Samples system memory on a fixed interval and raises threshold alerts
/// without the interactive console.
#[derive(Parser, Debug)]
#[command(name = "crashcap-daemon")]
#[command(version = VERSION)]
#[command(about = "CrashCap Daemon - headless memory monitor", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/crashcap/config.toml")]
    config: PathBuf,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Take a single sample and report status
    Check,

    /// Run the monitor loop until interrupted
    Watch,

    /// Generate a default configuration file
    GenerateConfig {
        /// Output path for the config file
        #[arg(short, long, default_value = "crashcap.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::GenerateConfig { output }) = &cli.command {
        return generate_config(output);
    }

    // Load and validate before anything else; bad config must never reach
    // the monitor loop
    let config = load_config(&cli.config)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    init_logging(&config.logging)?;

    info!("CrashCap daemon v{} starting", VERSION);
    info!("Configuration loaded and validated");

    match cli.command {
        Some(Commands::Check) => run_check(config).await?,
        Some(Commands::Watch) | None => run_watch(config).await?,
        Some(Commands::GenerateConfig { .. }) => unreachable!("handled above"),
    }

    Ok(())
}

/// Single sample plus swap and pressure readout.
async fn run_check(config: Config) -> Result<()> {
    let mut sampler = SystemSampler::new();
    let snapshot = sampler.sample()?;

    info!(
        "Memory: {:.1}% used ({} MB of {} MB, {} MB available)",
        snapshot.used_percent,
        snapshot.used_bytes / (1024 * 1024),
        snapshot.total_bytes / (1024 * 1024),
        snapshot.available_bytes / (1024 * 1024),
    );
    info!("Swap: {:.1}% used", snapshot.swap_used_percent);
    info!("CPU: {:.1}%", snapshot.cpu_percent);

    match SwapStatus::read() {
        Ok(swap) if swap.is_empty() => info!("No active swap areas"),
        Ok(swap) => info!(
            "Swap areas: {} ({} MB total, {} MB used)",
            swap.devices.len(),
            swap.total_kib() / 1024,
            swap.used_kib() / 1024
        ),
        Err(e) => warn!("Swap status unavailable: {}", e),
    }

    match MemoryPressure::read() {
        Ok(p) => info!(
            "Memory pressure: {} (some avg10 {:.2}%, full avg10 {:.2}%)",
            p.status(),
            p.some_avg10,
            p.full_avg10
        ),
        Err(e) => warn!("Memory pressure unavailable: {}", e),
    }

    if snapshot.used_percent >= config.monitor.memory_threshold {
        warn!(
            "Usage is at or above the {:.0}% threshold",
            config.monitor.memory_threshold
        );
    } else {
        info!(
            "Usage is below the {:.0}% threshold",
            config.monitor.memory_threshold
        );
    }

    Ok(())
}

/// Run the monitor loop until ctrl-c.
async fn run_watch(config: Config) -> Result<()> {
    let notifier = notifier_from_config(&config.notifications);
    let handle = start_monitor(&config.monitor, notifier)
        .map_err(|e| anyhow::anyhow!("Failed to start monitor: {}", e))?;

    info!(
        "Monitoring: threshold {:.0}%, interval {}s, recovery notifications {}",
        config.monitor.memory_threshold,
        config.monitor.check_interval_secs,
        if config.monitor.notify_on_recovery {
            "on"
        } else {
            "off"
        }
    );

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, stopping monitor");

    let status = handle.status();
    handle.stop().await;

    info!(
        "Final stats: ticks={}, failed_samples={}, alerts={}, recoveries={}",
        status.stats.total_ticks,
        status.stats.failed_samples,
        status.stats.alerts_raised,
        status.stats.recoveries
    );

    Ok(())
}

/// Write a default configuration file.
fn generate_config(output: &PathBuf) -> Result<()> {
    let config = Config::default();
    config
        .save_to_file(output)
        .map_err(|e| anyhow::anyhow!("Failed to save configuration file: {}", e))?;

    println!("Configuration file written to {}", output.display());
    Ok(())
}

/// Load configuration from file, falling back to defaults when absent.
fn load_config(path: &PathBuf) -> Result<Config> {
    if path.exists() {
        Config::load_from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
    } else {
        eprintln!(
            "Configuration file not found: {}, using defaults",
            path.display()
        );
        Ok(Config::default())
    }
}

/// Initialize logging with stdout and rolling file output.
fn init_logging(log_config: &LogConfig) -> Result<()> {
    std::fs::create_dir_all(&log_config.log_dir)?;

    let file_appender =
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(true)
                .with_target(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Keep the appender guard alive for the process lifetime
    std::mem::forget(guard);

    Ok(())
}
