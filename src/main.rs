use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use escola_api::app::{app, AppState};
use escola_api::config::config;
use escola_api::database::{DatabaseManager, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config();
    tracing::info!("Starting Escola API in {:?} mode", config.environment);
    config.validate().map_err(anyhow::Error::msg)?;

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    let state = AppState::new(config.clone(), Arc::new(PgStore::new(pool)))?;

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Escola API listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}
