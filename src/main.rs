//! Faction Poll service binary
//!
//! Loads configuration, initializes logging and application state, then
//! serves the HTTP API until SIGINT or SIGTERM.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use faction_poll::config::{validate_config, AppConfig};
use faction_poll::http::{RatingServer, ServerConfig};
use faction_poll::service::{AppState, HealthCheck, HealthStatus};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// How often the running service logs its own health
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Anonymous faction rating service with aggregate statistics
#[derive(Parser, Debug)]
#[command(name = "faction-poll", version)]
struct Args {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    debug: bool,

    /// Override HTTP server port
    #[arg(long, value_name = "PORT")]
    http_port: Option<u16>,

    /// Override the rating document path
    #[arg(long, value_name = "FILE")]
    data_file: Option<PathBuf>,

    /// Validate configuration and exit without starting service
    #[arg(long)]
    dry_run: bool,

    /// Check storage health once and exit with a status code
    #[arg(long)]
    health_check: bool,
}

impl Args {
    /// Resolve configuration: file or environment, then CLI overrides
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::from_env()?,
        };

        if let Some(log_level) = &self.log_level {
            config.service.log_level = log_level.clone();
        }
        if self.debug {
            config.service.log_level = "debug".to_string();
        }
        if let Some(port) = self.http_port {
            config.service.http_port = port;
        }
        if let Some(data_file) = &self.data_file {
            config.storage.data_file = data_file.clone();
        }

        validate_config(&config)?;
        Ok(config)
    }
}

fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to initialize logging")
}

fn log_config(config: &AppConfig) {
    info!(
        service = %config.service.name,
        host = %config.service.http_host,
        port = config.service.http_port,
        data_file = %config.storage.data_file.display(),
        history_limit = config.storage.history_limit,
        factions = config.catalog.factions.len(),
        "Faction Poll configuration"
    );
}

/// One-shot health check for container probes
async fn health_check_once(config: AppConfig) -> Result<ExitCode> {
    let state = Arc::new(AppState::new(config)?);
    state.set_running(true).await;

    let health = HealthCheck::check(state).await?;
    println!("{}", health.to_json()?);

    Ok(match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => ExitCode::SUCCESS,
        HealthStatus::Unhealthy => ExitCode::FAILURE,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

/// Log a health summary until the service stops
async fn log_health_periodically(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(HEALTH_LOG_INTERVAL);

    while state.is_running().await {
        interval.tick().await;

        match HealthCheck::check(state.clone()).await {
            Ok(health) => info!(
                "Health: {} - {} users, {} ratings",
                health.status, health.stats.user_count, health.stats.total_ratings
            ),
            Err(e) => warn!("Health check failed: {}", e),
        }
    }
}

async fn run(config: AppConfig) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone())?);

    // An unreadable rating file is reported now, not on the first request
    if let Err(e) = state.load_document() {
        warn!("Rating document is not readable yet: {:#}", e);
    }

    let server = Arc::new(RatingServer::new(
        ServerConfig {
            host: config.service.http_host.clone(),
            port: config.service.http_port,
        },
        state.clone(),
    ));

    let mut server_task = {
        let server = server.clone();
        tokio::spawn(async move { server.start().await })
    };
    state.set_running(true).await;
    let health_task = tokio::spawn(log_health_periodically(state.clone()));

    info!("Faction Poll is running, press Ctrl+C to stop");

    tokio::select! {
        _ = shutdown_signal() => {}
        joined = &mut server_task => {
            // The server ended without being asked to, e.g. the port was taken
            state.set_running(false).await;
            health_task.abort();
            return match joined {
                Ok(result) => result.and_then(|()| Err(anyhow!("HTTP server exited unexpectedly"))),
                Err(e) => Err(anyhow!("HTTP server task panicked: {}", e)),
            };
        }
    }

    state.set_running(false).await;
    health_task.abort();
    server.stop().await?;

    match tokio::time::timeout(config.shutdown_timeout(), server_task).await {
        Ok(Ok(Ok(()))) => info!("Shutdown complete"),
        Ok(Ok(Err(e))) => error!("HTTP server failed during shutdown: {:#}", e),
        Ok(Err(e)) => error!("HTTP server task panicked: {}", e),
        Err(_) => warn!("Shutdown timeout exceeded, forcing exit"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    if args.health_check {
        return match health_check_once(config).await {
            Ok(code) => code,
            Err(e) => {
                error!("Health check failed: {:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    log_config(&config);
    if args.dry_run {
        info!("Configuration is valid, exiting (dry run)");
        return ExitCode::SUCCESS;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Service failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
