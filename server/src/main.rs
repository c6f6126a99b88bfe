use std::sync::Arc;

use anyhow::Context;
use arena_server::config::ServerConfig;
use arena_server::persistence::sqlite::Database;
use arena_server::{router, AppState};
use engine::EnginePool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing with span durations
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!("Starting chess arena server");

    let config = ServerConfig::from_env();
    tracing::info!("Using data directory: {}", config.data_dir.display());

    let db = Database::open(&config.database_path())
        .await
        .with_context(|| format!("opening {}", config.database_path().display()))?;

    let pool = Arc::new(EnginePool::new(
        config.engine_pool_size,
        config.bridge_config(),
    ));
    tracing::info!("Engine pool of {} bridges", pool.size());

    let addr = config.listen_addr()?;
    let state = AppState::new(config, &db, pool.clone());
    let games = state.games.clone();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .await?;

    games.shutdown().await;
    pool.shutdown().await;
    Ok(())
}
