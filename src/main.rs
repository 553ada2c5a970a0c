//! Offline Worker - standalone host
//!
//! Runs one worker version behind an HTTP binding: intercepted requests,
//! page messages and lifecycle events arrive as HTTP calls.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_worker::cache::{CacheStorage, SystemClock};
use offline_worker::lifecycle::{spawn_activation_listener, StandaloneHost};
use offline_worker::network::HttpNetwork;
use offline_worker::{create_router, spawn_expiration_sweep, AppState, Config, EngineConfig, Worker};

/// Main entry point for the standalone worker host.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load process and worker configuration
/// 3. Build the worker and start the activation listener
/// 4. Start the background expiration sweep
/// 5. Run the install step
/// 6. Serve the HTTP binding until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_worker=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Offline Worker");

    let config = Config::from_env();
    let engine_config = match &config.worker_config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading worker config from {}", path.display()))?,
        None => {
            warn!("WORKER_CONFIG not set, running without manifest or routes");
            EngineConfig::default()
        }
    };
    info!(
        "Configuration loaded: version={}, port={}, sweep_interval={}s",
        engine_config.version, config.server_port, config.sweep_interval
    );

    let storage = CacheStorage::new(Arc::new(SystemClock));
    let network = HttpNetwork::new(Duration::from_secs(config.fetch_timeout))
        .context("building HTTP client")?;
    let (host, activation_requests) = StandaloneHost::new();
    let worker = Arc::new(Worker::new(
        engine_config,
        storage.clone(),
        Arc::new(network),
        Arc::new(host),
    )?);

    let mut background = vec![spawn_activation_listener(
        activation_requests,
        worker.lifecycle().clone(),
    )];
    if config.sweep_interval > 0 {
        background.push(spawn_expiration_sweep(
            storage,
            worker.expiration_targets(),
            config.sweep_interval,
        ));
        info!("Background expiration sweep started");
    }

    if let Err(err) = worker.install().await {
        error!("Initial install failed, serving from the network until POST /lifecycle/install succeeds: {}", err);
    }

    let app = create_router(AppState::new(worker));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(background))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts the
/// background tasks.
async fn shutdown_signal(background: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
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

    for handle in background {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
