//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes under `/api/v1`
//! - The operation context extractor
//! - Error responses

pub mod error;
pub mod extractors;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use treasury_core::TreasuryEngine;
use treasury_core::store::TreasuryStore;

pub use error::{ApiError, ApiResult};
pub use extractors::Ctx;

/// Application state shared across handlers.
pub struct AppState<S: TreasuryStore> {
    /// Treasury services over one store.
    pub engine: Arc<TreasuryEngine<S>>,
}

impl<S: TreasuryStore> AppState<S> {
    /// Wraps an engine.
    #[must_use]
    pub fn new(engine: TreasuryEngine<S>) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

impl<S: TreasuryStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

/// Creates the main application router.
pub fn create_router<S: TreasuryStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .merge(routes::health::routes::<S>())
        .nest("/api/v1", routes::api_routes::<S>())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
