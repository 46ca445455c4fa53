//! Bank statement import, matching and suspense routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use treasury_core::reconciliation::types::{
    AutoMatchReport, ImportStatementInput, ImportedStatement, StatementItem, StatementSummary,
};
use treasury_core::store::TreasuryStore;
use treasury_shared::types::{MovementId, StatementId, StatementItemId};

use crate::{AppState, ApiResult, Ctx};

/// Creates the statement routes.
pub fn routes<S: TreasuryStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/statements", post(import_statement::<S>))
        .route("/statements/{statement_id}/items", get(statement_items::<S>))
        .route(
            "/statements/{statement_id}/summary",
            get(statement_summary::<S>),
        )
        .route("/statements/{statement_id}/auto-match", post(auto_match::<S>))
        .route(
            "/statements/{statement_id}/sweep-suspense",
            post(sweep_suspense::<S>),
        )
        .route("/statement-items/{item_id}/match", post(manual_match::<S>))
        .route("/statement-items/{item_id}/unmatch", post(unmatch::<S>))
        .route("/statement-items/{item_id}/suspense", post(mark_suspense::<S>))
}

/// Request body for a manual match.
#[derive(Debug, Deserialize)]
pub struct ManualMatchRequest {
    /// Movement to pair with the item.
    pub movement_id: MovementId,
}

/// Request body for parking an item.
#[derive(Debug, Deserialize)]
pub struct SuspenseRequest {
    /// Why no match exists.
    pub note: String,
}

/// Request body for a suspense sweep.
#[derive(Debug, Deserialize)]
pub struct SweepRequest {
    /// Reference date, defaults to today.
    pub as_of: Option<NaiveDate>,
}

/// POST `/statements` - Import a normalized statement.
async fn import_statement<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Json(input): Json<ImportStatementInput>,
) -> ApiResult<(StatusCode, Json<ImportedStatement>)> {
    let imported = state
        .engine
        .reconciliation
        .import_statement(&ctx, input)
        .await?;
    Ok((StatusCode::CREATED, Json(imported)))
}

/// GET `/statements/{statement_id}/items`
async fn statement_items<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(statement_id): Path<StatementId>,
) -> ApiResult<Json<Vec<StatementItem>>> {
    Ok(Json(
        state
            .engine
            .reconciliation
            .statement_items(&ctx, statement_id)
            .await?,
    ))
}

/// GET `/statements/{statement_id}/summary`
async fn statement_summary<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(statement_id): Path<StatementId>,
) -> ApiResult<Json<StatementSummary>> {
    Ok(Json(
        state
            .engine
            .reconciliation
            .statement_summary(&ctx, statement_id)
            .await?,
    ))
}

/// POST `/statements/{statement_id}/auto-match`
async fn auto_match<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(statement_id): Path<StatementId>,
) -> ApiResult<Json<AutoMatchReport>> {
    Ok(Json(
        state
            .engine
            .reconciliation
            .auto_match(&ctx, statement_id)
            .await?,
    ))
}

/// POST `/statements/{statement_id}/sweep-suspense` - Returns the items parked.
async fn sweep_suspense<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(statement_id): Path<StatementId>,
    payload: Option<Json<SweepRequest>>,
) -> ApiResult<Json<Vec<StatementItem>>> {
    let as_of = payload
        .and_then(|Json(p)| p.as_of)
        .unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(
        state
            .engine
            .suspense
            .sweep_suspense(&ctx, statement_id, as_of)
            .await?,
    ))
}

/// POST `/statement-items/{item_id}/match`
async fn manual_match<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(item_id): Path<StatementItemId>,
    Json(payload): Json<ManualMatchRequest>,
) -> ApiResult<Json<StatementItem>> {
    Ok(Json(
        state
            .engine
            .reconciliation
            .manual_match(&ctx, item_id, payload.movement_id)
            .await?,
    ))
}

/// POST `/statement-items/{item_id}/unmatch`
async fn unmatch<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(item_id): Path<StatementItemId>,
) -> ApiResult<Json<StatementItem>> {
    Ok(Json(
        state.engine.reconciliation.unmatch(&ctx, item_id).await?,
    ))
}

/// POST `/statement-items/{item_id}/suspense`
async fn mark_suspense<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(item_id): Path<StatementItemId>,
    Json(payload): Json<SuspenseRequest>,
) -> ApiResult<Json<StatementItem>> {
    Ok(Json(
        state
            .engine
            .suspense
            .mark_suspense(&ctx, item_id, &payload.note)
            .await?,
    ))
}
