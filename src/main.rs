use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use kaanoon_rag::core::config::{AppPaths, ConfigService, Settings};
use kaanoon_rag::core::logging;
use kaanoon_rag::server;
use kaanoon_rag::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());

    let config = ConfigService::new(paths.clone());
    let raw = config
        .load_config()
        .context("Failed to load configuration")?;
    let settings = Settings::from_value(&raw).context("Invalid configuration")?;

    logging::init(&paths, &settings.logging);
    tracing::info!(
        "Loaded configuration from {}: {}",
        config.config_path().display(),
        config.redact_sensitive_values(&raw)
    );

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);

    // Index provisioning happens here, before the listener exists.
    let state = AppState::initialize(settings)
        .await
        .context("Failed to initialize application state")?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
