//! API route definitions.

use axum::Router;
use treasury_core::store::TreasuryStore;

use crate::AppState;

pub mod accounts;
pub mod health;
pub mod movements;
pub mod operations;
pub mod statements;

/// Creates the `/api/v1` router.
pub fn api_routes<S: TreasuryStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .merge(accounts::routes::<S>())
        .merge(movements::routes::<S>())
        .merge(operations::routes::<S>())
        .merge(statements::routes::<S>())
}
