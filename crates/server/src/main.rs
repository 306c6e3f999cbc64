use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pokeindex_core::{
    create_sync_system, load_config, validate_config, Fetcher, HttpFetcher, RecordStore,
    SqliteRecordStore, SyncOptions,
};
use pokeindex_server::api::create_router;
use pokeindex_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("POKEINDEX_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Catalog source: {}", config.api.base_url);

    let store: Arc<dyn RecordStore> = Arc::new(
        SqliteRecordStore::new(&config.database.path).context("Failed to open record store")?,
    );
    info!("Record store initialized");

    let fetcher: Arc<dyn Fetcher> =
        Arc::new(HttpFetcher::new(&config.api).context("Failed to create HTTP client")?);

    let options = SyncOptions::from_config(&config).context("Invalid catalog URL")?;

    // Create sync system
    let (sync_handle, controller) = create_sync_system(options, Arc::clone(&store), fetcher);
    let controller_handle = tokio::spawn(controller.run());

    if config.sync.sync_on_startup {
        info!("Starting catalog sync");
        sync_handle.sync_all_catalog().await;
    }

    let state = Arc::new(AppState::new(config.clone(), store, sync_handle.clone()));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    // The router's state was dropped with the server; dropping the last
    // handle closes the controller channel.
    drop(sync_handle);
    let _ = controller_handle.await;
    info!("Sync controller stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
