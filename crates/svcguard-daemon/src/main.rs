use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use svcguard_core::VERSION;
use svcguard_daemon::config::LogConfig;
use svcguard_daemon::{shutdown, Config, Scheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// svcguard - service watchdog daemon
///
/// Watches configured services, reports state changes and restarts
/// services that stopped when auto-start is enabled
#[derive(Parser, Debug)]
#[command(name = "svcguard-daemon")]
#[command(version = VERSION)]
#[command(about = "svcguard Daemon - service watchdog", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "SVCGUARD_CONFIG", default_value = "/etc/svcguard/config.toml")]
    config: PathBuf,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Continuous polling with automatic remediation
    Run,

    /// Run a single reconciliation cycle and print the report batch
    Once,

    /// Check the configuration file and exit
    Validate,

    /// Generate a sample configuration file
    GenerateConfig {
        /// Output path for config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::GenerateConfig { output }) = &cli.command {
        return generate_config(output);
    }

    let config = load_config(&cli.config)?;
    let _guard = init_logging(&config.logging)?;

    info!("svcguard daemon v{} starting...", VERSION);

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    info!(
        "Configuration loaded and validated successfully ({} services)",
        config.services.len()
    );

    match cli.command {
        Some(Commands::Once) => run_once(&config)?,
        Some(Commands::Validate) => info!("Configuration is valid"),
        Some(Commands::Run) => run_watch_loop(&config).await,
        // Handled before the configuration is loaded
        Some(Commands::GenerateConfig { .. }) => {}
        None => {
            info!("No command specified, running watch loop by default");
            run_watch_loop(&config).await
        }
    }

    Ok(())
}

/// Run a single cycle and print the resulting batch as JSON
fn run_once(config: &Config) -> Result<()> {
    let mut scheduler = Scheduler::from_config(config);

    match scheduler.run_once() {
        Some(batch) => {
            println!("{}", serde_json::to_string_pretty(&batch)?);
            Ok(())
        }
        None => Err(anyhow::anyhow!("Service manager unavailable")),
    }
}

/// Poll until Ctrl-C or SIGTERM
async fn run_watch_loop(config: &Config) {
    if config.services.is_empty() {
        warn!("No services configured, cycles will report nothing");
    }

    let cancel = CancellationToken::new();
    if let Err(e) = shutdown::listen(cancel.clone()) {
        error!("Failed to install shutdown handlers: {}", e);
    }

    let stats = Scheduler::from_config(config).run(cancel).await;

    info!(
        "Final stats: cycles={}, records={}, starts confirmed={}, alerts={}",
        stats.total_cycles, stats.total_records, stats.remediation_confirmed, stats.alerts_emitted
    );
}

/// Generate sample configuration file
fn generate_config(output: &Path) -> Result<()> {
    Config::example()
        .save_to_file(output)
        .with_context(|| format!("Failed to save configuration file {:?}", output))?;

    println!("Configuration file generated: {:?}", output);
    Ok(())
}

/// Load configuration from file or use defaults
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load_from_file(path)
            .with_context(|| format!("Failed to load configuration file {:?}", path))
    } else {
        eprintln!("Configuration file not found: {:?}, using defaults", path);
        Ok(Config::default())
    }
}

/// Initialize logging with file and stdout output
fn init_logging(logging: &LogConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&logging.log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", logging.log_dir))?;

    let file_appender = tracing_appender::rolling::daily(&logging.log_dir, &logging.file_name);
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
                .unwrap_or_else(|_| logging.level.as_str().into()),
        )
        .init();

    info!("Logging initialized");

    Ok(guard)
}
