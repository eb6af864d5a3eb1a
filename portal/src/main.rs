//! Campus portal server.
//!
//! Opens the event log, rebuilds state from it and serves the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! PORTAL_EVENT_LOG=data/events.jsonl PORT=8080 cargo run --bin campus-portal
//! ```

use anyhow::Context;
use campus_portal::{AppState, Config, PortalApp, build_router};
use campus_runtime::metrics::{install_recorder, register_metrics};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},campus_portal=debug", config.server.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting campus portal...");
    tracing::info!(
        bind = %config.bind_address(),
        event_log = %config.storage.event_log,
        "Configuration loaded"
    );

    let metrics = match install_recorder() {
        Ok(handle) => {
            register_metrics();
            Some(handle)
        },
        Err(error) => {
            tracing::warn!(%error, "Metrics disabled");
            None
        },
    };

    let app = PortalApp::new(&config)
        .await
        .context("Failed to initialize portal")?;
    let service = app.service.clone();

    let router = build_router(AppState::new(app.service, metrics));
    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;

    tracing::info!(address = %config.bind_address(), "Campus portal is listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down gracefully...");
    service
        .shutdown(config.shutdown_timeout())
        .await
        .context("Store did not drain in time")?;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for Ctrl+C");
    }
}
