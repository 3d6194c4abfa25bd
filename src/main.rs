//! LiveWatch Server: stream presence monitoring and notification engine
//!
//! Main entry point that wires all crates together and runs the polling
//! scheduler until shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use livewatch_core::config::AppConfig;
use livewatch_core::error::AppError;
use livewatch_discord::DiscordClient;
use livewatch_platform::AdapterRegistry;
use livewatch_store::StateStore;
use livewatch_store::backup::build_transport;
use livewatch_worker::{BackupRunner, PresenceScheduler, RetryPolicy};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("LIVEWATCH_CONFIG").unwrap_or_else(|_| "config/default".to_string());
    let env = std::env::var("LIVEWATCH_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load_layered(&config_path, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting LiveWatch v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Create data directories ──────────────────────────
    create_data_directories(&config).await?;

    // ── Step 2: Backup transport ─────────────────────────────────
    tracing::info!(
        "Initializing backup transport (provider: {:?})...",
        config.backup.provider
    );
    let transport = build_transport(
        &config.backup,
        Duration::from_secs(config.platforms.request_timeout_seconds),
    )
    .await?;

    // ── Step 3: Open state store with recovery ───────────────────
    tracing::info!("Loading state from '{}'...", config.storage.state_path().display());
    let (store, report) = StateStore::open(&config.storage, transport.clone()).await?;
    for path in &report.quarantined {
        tracing::warn!("Corrupt state quarantined to '{}'", path.display());
    }
    tracing::info!(
        "State loaded from {} ({} communities)",
        report.source.as_str(),
        store.community_ids().len()
    );
    let store = Arc::new(store);

    // ── Step 4: Platform adapters and chat client ────────────────
    let adapters = AdapterRegistry::from_config(&config.platforms)?;
    if adapters.is_empty() {
        tracing::warn!("No platform adapters enabled; links will not be checked");
    }
    let chat = Arc::new(DiscordClient::new(&config.discord)?);

    // ── Step 5: Scheduler ────────────────────────────────────────
    let scheduler = Arc::new(PresenceScheduler::new(
        Arc::clone(&store),
        adapters,
        chat,
        config.scheduler.clone(),
        RetryPolicy::from_config(&config.retry),
    ));

    // ── Step 6: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 7: Start polling ────────────────────────────────────
    let scheduler_handle = if config.scheduler.enabled {
        let handle = tokio::spawn(Arc::clone(&scheduler).run(shutdown_rx));
        tracing::info!("Presence scheduler started");
        Some(handle)
    } else {
        tracing::info!("Presence scheduler disabled");
        None
    };

    // ── Step 8: Start backup job ─────────────────────────────────
    let mut backup_runner = if transport.is_some() {
        let runner = BackupRunner::new(Arc::clone(&store), &config.backup).await?;
        runner.start().await?;
        Some(runner)
    } else {
        None
    };

    // ── Step 9: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    if let Some(handle) = scheduler_handle {
        let grace = Duration::from_secs(config.scheduler.shutdown_grace_seconds + 5);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Scheduler did not stop in time");
        }
    }

    if let Some(runner) = backup_runner.as_mut() {
        if let Err(e) = runner.shutdown().await {
            tracing::warn!("Backup scheduler shutdown failed: {}", e);
        }
    }

    store.persist().await?;

    tracing::info!("LiveWatch server shut down gracefully");
    Ok(())
}

/// Create required data directories
async fn create_data_directories(config: &AppConfig) -> Result<(), AppError> {
    let mut dirs = vec![
        config.storage.data_root.clone(),
        config.storage.quarantine_path().display().to_string(),
    ];
    if config.backup.provider == livewatch_core::config::BackupProviderKind::Directory {
        dirs.push(config.backup.directory.clone());
    }

    for dir in &dirs {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::storage(format!("Failed to create dir '{}': {}", dir, e)))?;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
