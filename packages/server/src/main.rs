use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::build_blob_store;
use dedup_server::build_router;
use dedup_server::config::AppConfig;
use dedup_server::database::init_db;
use dedup_server::repository::{DatabaseRepository, FileRecordRepository, MemoryRepository};
use dedup_server::state::AppState;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dedup_server=info,common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let repository: Arc<dyn FileRecordRepository> = match &config.database {
        Some(db_config) => {
            let db = init_db(db_config)
                .await
                .context("Failed to connect to database")?;
            Arc::new(DatabaseRepository::new(db))
        }
        None => {
            info!("No database configured; file records are kept in memory");
            Arc::new(MemoryRepository::new())
        }
    };

    let blob_store = build_blob_store(&config.storage)
        .await
        .context("Failed to initialize blob store")?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let app = build_router(AppState::new(repository, blob_store, config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
