use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use citysense_core::{MetricStore, ReadingStore};
use citysense_db::{mask_database_url, DbClient};
use citysense_metrics::MemoryStore;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    // Observability
    citysense_obs::init("citysensed");

    // Config
    let cfg = citysense_config::AppConfig::load().context("failed to load configuration")?;
    let http_bind = cfg.http_bind();

    // Storage
    let (metrics, readings): (Arc<dyn MetricStore>, Arc<dyn ReadingStore>) =
        match cfg.database_url() {
            Some(url) => {
                tracing::info!(database = %mask_database_url(url), "Connecting to database");
                let client = DbClient::with_max_connections(url, cfg.max_connections())
                    .await
                    .context("failed to connect to database")?;
                client
                    .ensure_schema()
                    .await
                    .context("failed to create database schema")?;
                let client = Arc::new(client);
                (client.clone(), client)
            }
            None => {
                tracing::warn!("No database configured, keeping data in memory");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

    let (app, state) = citysense_server::build_app(metrics, readings)?;

    // Start HTTP server
    let addr: SocketAddr = http_bind
        .parse()
        .with_context(|| format!("invalid HTTP bind address {http_bind}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;

    // Mark ready just before serving
    citysense_server::set_ready(&state, true);

    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
