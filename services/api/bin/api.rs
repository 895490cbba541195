//! Main Entrypoint for the Course Architect API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Connecting the course store and bootstrapping the graph schema.
//! 3. Wiring the model clients, research tools and generation pipeline.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use course_architect_api::{config::Config, init_tracing, router::create_router, state::AppState};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    init_tracing(config.log_level);
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Store, Clients and Pipeline ---
    let bind_address = config.bind_address;
    let app_state = Arc::new(
        AppState::build(config)
            .await
            .context("Failed to initialize application state")?,
    );

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let config = app_state.config.clone();
    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        llm_mode = %config.llm_mode,
        model = %config.llm_credentials.model,
        backend = ?config.graph_backend,
        strategy = ?config.architect_strategy,
        bind_address = %bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
