use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use bingeboard_api::api::{create_router, AppState};
use bingeboard_api::config::Config;
use bingeboard_api::stores::{InMemoryShowCatalog, InMemoryWatchHistory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let catalog = Arc::new(InMemoryShowCatalog::new());
    let watch_history = Arc::new(InMemoryWatchHistory::new());
    let state = AppState::new(catalog, watch_history);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
