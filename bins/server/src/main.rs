//! Treasury API Server
//!
//! Main entry point for the treasury ledger and reconciliation service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use treasury_api::{AppState, create_router};
use treasury_core::TreasuryEngine;
use treasury_db::{SeaOrmStore, connect};
use treasury_shared::{AppConfig, AppError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "treasury=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(&config.database)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let store = Arc::new(SeaOrmStore::new(Arc::new(db)));
    let engine = TreasuryEngine::new(store, &config.reconciliation);
    info!(
        date_tolerance_days = config.reconciliation.date_tolerance_days,
        min_auto_confidence = %config.reconciliation.min_auto_confidence,
        suspense_grace_days = config.reconciliation.suspense_grace_days,
        "Reconciliation configured"
    );

    let app = create_router(AppState::new(engine));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
