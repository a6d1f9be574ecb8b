//! Hierarchy Cache - a multi-tier cache service for knowledge trees
//!
//! Serves cached hierarchy trees instantly while revalidating them in the
//! background, with structural-checksum change detection and single-node
//! incremental updates.

mod api;
mod cache;
mod config;
mod error;
mod models;
mod refresh;
mod source;
mod tasks;
mod tree;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{create_router, AppState};
use cache::CacheCoordinator;
use config::Config;
use refresh::RefreshOrchestrator;
use source::RemoteTreeSource;
use tasks::{spawn_cleanup_task, spawn_warmup_task};

/// Main entry point for the hierarchy cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the cache coordinator (tiers that fail to open are degraded)
/// 4. Wire the tree source and refresh orchestrator
/// 5. Start the background cleanup and cache warming tasks
/// 6. Create the Axum router and start the HTTP server
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hierarchy_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hierarchy Cache Service");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: storage_dir={}, memory_ttl={}s, durable_ttl={}s, poll_interval={}s, port={}",
        config.storage_dir.display(),
        config.memory_ttl_secs,
        config.durable_ttl_secs,
        config.poll_interval_secs,
        config.server_port
    );

    // Open the tier stack; unavailable tiers degrade with a warning
    let coordinator = Arc::new(CacheCoordinator::open(config.tier_options()).await);

    // Wire the source and orchestrator explicitly; nothing is module-global
    let source = Arc::new(RemoteTreeSource::new(config.source_base_url.clone()));
    let poll_interval = match config.poll_interval_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let orchestrator = RefreshOrchestrator::new(coordinator.clone(), source, poll_interval);
    let state = AppState::new(orchestrator.clone());
    info!("Cache coordinator and orchestrator initialized");

    // Start background maintenance
    let cleanup_handle = spawn_cleanup_task(coordinator, config.cleanup_interval_secs);
    let warmup_handle = spawn_warmup_task(orchestrator.clone(), config.warm_keys.clone());
    info!("Background tasks started");

    // Create router with all endpoints
    let app = create_router(state);

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(orchestrator, cleanup_handle, warmup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown, stops poll timers and aborts the background tasks so the
/// server can drain cleanly.
async fn shutdown_signal(
    orchestrator: RefreshOrchestrator,
    cleanup_handle: tokio::task::JoinHandle<()>,
    warmup_handle: tokio::task::JoinHandle<()>,
) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    orchestrator.dispose();
    cleanup_handle.abort();
    warmup_handle.abort();
    warn!("Background tasks stopped");
}
