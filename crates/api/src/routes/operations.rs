//! Multi-leg operations: client payments, cash deposits and cash closings.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use treasury_core::composer::types::{
    CashClosing, CashClosingInput, CashDepositInput, CashDepositResult, ClientPaymentInput,
    ClientPaymentResult, ClosingApproval,
};
use treasury_core::store::TreasuryStore;
use treasury_shared::types::CashClosingId;

use crate::{AppState, ApiResult, Ctx};

/// Creates the operation routes.
pub fn routes<S: TreasuryStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/client-payments", post(create_client_payment::<S>))
        .route("/cash-deposits", post(create_cash_deposit::<S>))
        .route("/cash-closings", post(create_cash_closing::<S>))
        .route("/cash-closings/{closing_id}", get(get_cash_closing::<S>))
        .route(
            "/cash-closings/{closing_id}/approve",
            post(approve_cash_closing::<S>),
        )
}

/// Request body for approving a closing.
#[derive(Debug, Deserialize)]
pub struct ApproveClosingRequest {
    /// Required when the closing has a variance.
    #[serde(default)]
    pub note: String,
}

/// POST `/client-payments`
async fn create_client_payment<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Json(input): Json<ClientPaymentInput>,
) -> ApiResult<(StatusCode, Json<ClientPaymentResult>)> {
    let result = state
        .engine
        .composer
        .create_client_payment_movements(&ctx, input)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// POST `/cash-deposits`
async fn create_cash_deposit<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Json(input): Json<CashDepositInput>,
) -> ApiResult<(StatusCode, Json<CashDepositResult>)> {
    let result = state.engine.composer.create_cash_deposit(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// POST `/cash-closings`
async fn create_cash_closing<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Json(input): Json<CashClosingInput>,
) -> ApiResult<(StatusCode, Json<CashClosing>)> {
    let closing = state.engine.composer.create_cash_closing(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(closing)))
}

/// GET `/cash-closings/{closing_id}`
async fn get_cash_closing<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(closing_id): Path<CashClosingId>,
) -> ApiResult<Json<CashClosing>> {
    Ok(Json(state.engine.composer.closing(&ctx, closing_id).await?))
}

/// POST `/cash-closings/{closing_id}/approve` - Approve and book the variance.
async fn approve_cash_closing<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(closing_id): Path<CashClosingId>,
    Json(payload): Json<ApproveClosingRequest>,
) -> ApiResult<Json<ClosingApproval>> {
    let approval = state
        .engine
        .composer
        .approve_cash_closing_with_adjustment(&ctx, closing_id, &payload.note)
        .await?;
    Ok(Json(approval))
}
