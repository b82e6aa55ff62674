use anyhow::Context;
use tokio::net::TcpListener;

use ragdb_core::Settings;
use ragdb_server::{logging, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let settings = Settings::load().context("loading configuration")?;
    tracing::debug!(?settings, "configuration loaded");

    // The index must open (and probe the embedder) before we accept traffic.
    let bind_addr = settings.server.addr();
    let state = AppState::initialize(settings).await?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
