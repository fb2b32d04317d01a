use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cost_parser::{config::Config, server, transport::HttpTransport, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    info!("Starting cost parser");
    info!(
        onliner = %config.crawl.onliner_url,
        kufar = %config.crawl.kufar_api_url,
        max_pages = config.crawl.max_pages,
        fetch_concurrency = config.fetch.concurrency,
        max_concurrent_searches = config.max_concurrent_searches,
        "configuration loaded"
    );

    let transport = HttpTransport::new(config.http_timeout)?;
    let state = Arc::new(AppState::new(&config, Arc::new(transport)));
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Cost parser listening on http://{}", config.bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Cost parser stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
