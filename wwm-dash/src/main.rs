//! Operator console (wwm-dash) - Main entry point
//!
//! Runs the dashboard engine headless against a backend and logs every
//! state change and notification.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use wwm_common::config::{resolve_config, ConfigOverrides, LoggingConfig};
use wwm_common::events::DashboardEvent;
use wwm_dash::{DashboardEngine, DashboardView, HttpBackend, SseTransport};

/// Command-line arguments for wwm-dash
#[derive(Parser, Debug)]
#[command(name = "wwm-dash")]
#[command(about = "Operator console for the waste classification dashboard")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "WWM_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://192.168.1.20:5000
    #[arg(short, long, env = "WWM_BASE_URL")]
    base_url: Option<String>,

    /// Log level or filter directive
    #[arg(long, env = "WWM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Trigger a manual refresh every N seconds (0 = never)
    #[arg(long, default_value = "0")]
    refresh_interval_secs: u64,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let default_filter = match logging.level.as_str() {
        "" => "wwm_dash=info,wwm_common=info".to_string(),
        level if level.contains('=') => level.to_string(),
        level => format!("wwm_dash={level},wwm_common={level}"),
    };
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter))
    };

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter()))
        .with(file_layer)
        .init();
    Ok(())
}

fn log_view(view: &DashboardView) {
    let summary = view.summary();
    info!(
        phase = ?view.phase,
        syncing = view.syncing,
        connection = %view.connection,
        device_online = view.device.online,
        records = summary.total,
        organic_percent = view.stats.organic_percent(),
        inorganic_percent = view.stats.inorganic_percent(),
        stats_source = ?view.stats_source,
        weekly_average = view.stats.weekly_average(),
        "Dashboard updated"
    );
    if let Some(error) = &view.last_sync_error {
        warn!(%error, "Last sync failed, showing stale data");
    }
}

fn log_event(event: &DashboardEvent) {
    match event {
        DashboardEvent::SyncFailed { trigger, message } => {
            warn!(%trigger, %message, "Sync failed")
        }
        DashboardEvent::CorrectionFailed { id, message } => {
            warn!(id, %message, "Correction failed")
        }
        other => info!(event = other.event_type(), details = ?other, "Notification"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let overrides = ConfigOverrides {
        config_path: args.config.clone(),
        base_url: args.base_url.clone(),
        log_level: args.log_level.clone(),
    };
    let config = resolve_config(&overrides).context("Failed to load configuration")?;

    init_tracing(&config.logging)?;

    info!("Starting WWM dashboard console");
    info!(
        base_url = %config.base_url,
        events = %config.events_url(),
        "Backend"
    );

    let backend = HttpBackend::new(&config).context("Failed to create backend client")?;
    let transport = SseTransport::new(&config).context("Failed to create push transport")?;
    let handle = DashboardEngine::new(config, backend, transport).start();

    let mut views = handle.subscribe_view();
    let mut events = handle.subscribe_events();

    let refresh_enabled = args.refresh_interval_secs > 0;
    let mut refresh = tokio::time::interval(Duration::from_secs(args.refresh_interval_secs.max(1)));
    refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick fires immediately; the engine already loads on startup
    refresh.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = views.changed() => {
                if changed.is_err() {
                    warn!("Dashboard engine stopped unexpectedly");
                    break;
                }
                let view = views.borrow_and_update().clone();
                log_view(&view);
            },
            event = events.recv() => match event {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Notification log lagged"),
                Err(RecvError::Closed) => break,
            },
            // Outcome is logged from the notification stream
            _ = refresh.tick(), if refresh_enabled => {
                if let Err(e) = handle.request_refresh() {
                    warn!(error = %e, "Periodic refresh not started");
                }
            },
        }
    }

    handle.shutdown().await;
    info!("Console shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
