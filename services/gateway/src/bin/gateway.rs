//! services/gateway/src/bin/gateway.rs

use gateway_lib::{
    adapters::{FsResultStore, ProcessExtractor},
    config::Config,
    error::ApiError,
    web::{build_router, state::AppState},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Prepare Storage ---
    let store = Arc::new(FsResultStore::open(&config.results_dir).await?);
    tokio::fs::create_dir_all(&config.uploads_dir).await?;
    info!(
        "Results in {}, uploads staged in {}",
        config.results_dir.display(),
        config.uploads_dir.display()
    );

    // --- 3. Initialize the Extraction Adapter ---
    let shutdown = CancellationToken::new();
    let extractor = Arc::new(ProcessExtractor::new(
        config.extractor.clone(),
        shutdown.clone(),
    ));
    info!(
        "Extractor: {} {} (timeout {:?}, {} concurrent)",
        config.extractor.program,
        config.extractor.args.join(" "),
        config.extractor.timeout,
        config.extractor.max_concurrent
    );

    // --- 4. Build the Shared AppState and Router ---
    let app_state = Arc::new(AppState::new(store, extractor, config.clone()));
    let app = build_router(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped.");
    Ok(())
}

/// Resolves on Ctrl-C, cancelling in-flight extractions first.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, cancelling running extractions...");
    shutdown.cancel();
}
