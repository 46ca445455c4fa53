//! Database layer with `SeaORM` entities and the Postgres treasury store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - [`SeaOrmStore`], the Postgres implementation of the core storage seam
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod store;

pub use store::{SeaOrmStore, SeaOrmTx};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use treasury_shared::config::DatabaseConfig;

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.as_str());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    tracing::debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Opening database pool"
    );
    Database::connect(options).await
}
