//! Session Coordinator (wkune-sc) - Main entry point
//!
//! Serves the group pick coordination engine over HTTP with an SSE event
//! stream per session.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wkune_common::config::{resolve_database_path, resolve_root_folder, TomlConfig, DEFAULT_PORT};
use wkune_common::db::{init_database, init_memory_database, SqliteStore};
use wkune_common::events::EventBus;
use wkune_sc::{build_router, AppState, Coordinator, Policy};

/// Command-line arguments for wkune-sc
#[derive(Parser, Debug)]
#[command(name = "wkune-sc")]
#[command(about = "Session Coordinator for WKUNE group picks")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "WKUNE_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "WKUNE_BIND_ADDRESS")]
    bind: Option<String>,

    /// Root folder holding the database (env: WKUNE_ROOT_FOLDER)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Explicit config file instead of the platform default
    #[arg(short, long, env = "WKUNE_CONFIG")]
    config: Option<PathBuf>,

    /// Keep all state in memory; nothing survives a restart
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = match &args.config {
        Some(path) => TomlConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::load_or_default().context("Failed to load config")?,
    };

    // Initialize tracing
    let default_filter = format!("wkune_sc={0},wkune_common={0},tower_http=info", toml_config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting WKUNE Session Coordinator (wkune-sc) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let pool = if args.ephemeral {
        info!("Ephemeral mode: sessions are kept in memory only");
        init_memory_database()
            .await
            .context("Failed to initialize in-memory database")?
    } else {
        let root_folder = resolve_root_folder(
            args.root_folder.as_deref(),
            "WKUNE_ROOT_FOLDER",
            &toml_config,
        );
        let db_path = resolve_database_path(&root_folder, &toml_config);
        info!("Database path: {}", db_path.display());
        init_database(&db_path)
            .await
            .context("Failed to initialize database")?
    };

    let policy = &toml_config.policy;
    let coordinator = Arc::new(Coordinator::new(
        Arc::new(SqliteStore::new(pool)),
        EventBus::new(policy.event_capacity),
        Policy::from(policy),
    ));

    coordinator
        .cleanup_expired()
        .await
        .context("Failed to purge expired sessions")?;

    if policy.cleanup_interval_secs > 0 {
        spawn_cleanup_task(
            Arc::clone(&coordinator),
            Duration::from_secs(policy.cleanup_interval_secs),
        );
    }

    let app = build_router(AppState::new(coordinator));

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let bind = args
        .bind
        .or(toml_config.bind_address.clone())
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("wkune-sc listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Periodically purge expired sessions
fn spawn_cleanup_task(coordinator: Arc<Coordinator>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick fires immediately; startup already swept
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = coordinator.cleanup_expired().await {
                error!("Expired session sweep failed: {}", e);
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
