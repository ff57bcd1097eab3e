use clap::Parser;
use todo_core::Database;
use todo_server::{AppState, config::ServerConfig, router};
use tracing_subscriber::{EnvFilter, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    let env_filter = EnvFilter::try_new(config.log_filter())?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let db = match &config.database_url {
        Some(url) => Database::connect_url(url).await?,
        None => Database::connect().await?,
    };

    let app = router(AppState::new(db));
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
