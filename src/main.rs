//! Main entry point for the patient-queue service
//!
//! Loads configuration, seeds the queue store, serves the queue boards and
//! shuts down gracefully on SIGINT/SIGTERM.

use anyhow::Result;
use clap::Parser;
use patient_queue::config::{validate_config, AppConfig};
use patient_queue::service::{AppState, HealthCheck, HealthStatus, ServiceContext};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Patient Queue Service - priority ranking and wait boards for hospital service points
#[derive(Parser)]
#[command(
    name = "patient-queue",
    version,
    about = "Patient-flow queue service for hospital service points",
    long_about = "Patient Queue ranks waiting patients at each service point by priority and \
                 quoted wait, serves the boards shown on waiting-room displays over HTTP, and \
                 learns from observed waits to quote new arrivals."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Perform health check and exit
    #[arg(long, help = "Perform a health check and exit with status code")]
    health_check: bool,

    /// Print the health check as JSON
    #[arg(long, requires = "health_check", help = "Print the full health report as JSON")]
    json: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override HTTP server port")]
    http_port: Option<u16>,

    /// Seed file override
    #[arg(
        long,
        value_name = "FILE",
        help = "Load queue entries from a JSON array at startup"
    )]
    seed: Option<PathBuf>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Perform health check and return appropriate exit code
async fn perform_health_check(config: AppConfig, json: bool) -> Result<()> {
    info!("Performing health check...");

    let app_state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Health check failed: {}", e);
            std::process::exit(1);
        }
    };

    // Components are built but no server is started for a one-shot check
    let context = app_state.context();
    context.set_running(true).await;

    match HealthCheck::check(&context).await {
        Ok(health) if json => {
            println!("{}", health.to_json()?);
            std::process::exit(if health.status == HealthStatus::Healthy { 0 } else { 1 });
        }
        Ok(health) => {
            println!("Health Check: {}", health.status);
            println!("  Entries: {}", health.stats.total_entries);
            println!("  Active: {}", health.stats.active_entries);
            println!("  Waiting: {}", health.stats.patients_waiting);
            println!("  Serving: {}", health.stats.patients_serving);

            if health.status == HealthStatus::Healthy {
                std::process::exit(0);
            } else {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Log a health summary every 30 seconds
async fn health_check_task(context: Arc<ServiceContext>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));

    while context.is_running().await {
        interval.tick().await;

        match HealthCheck::check(&context).await {
            Ok(health) => {
                info!(
                    "Health check: {} - {} waiting, {} being served",
                    health.status, health.stats.patients_waiting, health.stats.patients_serving
                );
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
            }
        }
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🏥 Patient Queue Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   HTTP: {}:{}",
        config.service.http_host, config.service.http_port
    );
    match &config.queue.seed_file {
        Some(path) => info!("   Seed file: {}", path.display()),
        None => info!("   Seed file: none"),
    }
    info!(
        "   Board size: {} (max {})",
        config.queue.default_next_count, config.queue.max_next_count
    );
    info!(
        "   Quote missing waits: {}",
        config.queue.quote_missing_wait
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load configuration from file or environment, then apply CLI overrides
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(http_port) = args.http_port {
        config.service.http_port = http_port;
    }

    if let Some(seed) = &args.seed {
        config.queue.seed_file = Some(seed.clone());
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.health_check {
        return perform_health_check(config, args.json).await;
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let mut app_state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    let health_task = tokio::spawn(health_check_task(app_state.context()));

    info!("✅ Patient Queue Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");
    health_task.abort();

    match tokio::time::timeout(config.shutdown_timeout(), app_state.shutdown()).await {
        Ok(Ok(())) => {
            info!("✅ Graceful shutdown completed successfully");
        }
        Ok(Err(e)) => {
            warn!("Shutdown finished with errors: {}", e);
        }
        Err(_) => {
            warn!("⚠️  Shutdown timeout exceeded, forcing exit");
        }
    }

    info!("🛑 Patient Queue Service stopped");
    Ok(())
}
