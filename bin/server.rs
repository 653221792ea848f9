// IE Bank - Web Server
// REST API for account resources with Axum

use anyhow::{Context, Result};
use iebank_api::{logging, open_database, router, AppState, ServerConfig};
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env();
    logging::init(config.log_format);

    tracing::info!(version = iebank_api::VERSION, "IE Bank accounts API starting");

    let conn = open_database(&config.db_path)?;
    tracing::info!(db_path = %config.db_path, "database opened");

    let app = router(AppState::new(conn));

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
