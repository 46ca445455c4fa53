//! Movement, confirmation and reversal routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use treasury_core::ledger::types::{DocumentRef, Movement, RecordMovementInput};
use treasury_core::store::TreasuryStore;
use treasury_shared::types::MovementId;

use crate::{AppState, ApiResult, Ctx};

/// Creates the movement routes.
pub fn routes<S: TreasuryStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/movements", post(record_movement::<S>))
        .route("/movements/{movement_id}", get(get_movement::<S>))
        .route("/movements/{movement_id}/confirm", post(confirm_pending::<S>))
        .route("/movements/{movement_id}/reverse", post(reverse::<S>))
        .route(
            "/documents/{reference_type}/{reference_id}/movements",
            get(document_movements::<S>),
        )
        .route(
            "/documents/{reference_type}/{reference_id}/reverse",
            post(reverse_document::<S>),
        )
}

/// Request body for reversals.
#[derive(Debug, Deserialize)]
pub struct ReverseRequest {
    /// Why the movement is reversed.
    pub reason: String,
}

/// POST `/movements` - Record one movement.
async fn record_movement<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Json(input): Json<RecordMovementInput>,
) -> ApiResult<(StatusCode, Json<Movement>)> {
    let movement = state.engine.ledger.record_movement(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// GET `/movements/{movement_id}`
async fn get_movement<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(movement_id): Path<MovementId>,
) -> ApiResult<Json<Movement>> {
    Ok(Json(state.engine.ledger.movement(&ctx, movement_id).await?))
}

/// POST `/movements/{movement_id}/confirm` - Confirm a pending movement.
async fn confirm_pending<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(movement_id): Path<MovementId>,
) -> ApiResult<Json<Movement>> {
    Ok(Json(
        state.engine.ledger.confirm_pending(&ctx, movement_id).await?,
    ))
}

/// POST `/movements/{movement_id}/reverse` - Returns the offsetting movement.
async fn reverse<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(movement_id): Path<MovementId>,
    Json(payload): Json<ReverseRequest>,
) -> ApiResult<(StatusCode, Json<Movement>)> {
    let offset = state
        .engine
        .reversal
        .reverse(&ctx, movement_id, &payload.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(offset)))
}

/// GET `/documents/{reference_type}/{reference_id}/movements`
async fn document_movements<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path((reference_type, reference_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<Movement>>> {
    let document = DocumentRef::new(reference_type, reference_id);
    Ok(Json(
        state
            .engine
            .ledger
            .movements_for_document(&ctx, &document)
            .await?,
    ))
}

/// POST `/documents/{reference_type}/{reference_id}/reverse` - Reverse a whole document.
async fn reverse_document<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path((reference_type, reference_id)): Path<(String, String)>,
    Json(payload): Json<ReverseRequest>,
) -> ApiResult<(StatusCode, Json<Vec<Movement>>)> {
    let document = DocumentRef::new(reference_type, reference_id);
    let offsets = state
        .engine
        .reversal
        .reverse_all_for_document(&ctx, &document, &payload.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(offsets)))
}
