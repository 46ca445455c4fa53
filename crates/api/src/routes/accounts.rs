//! Account, check and position routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use treasury_core::registry::types::{
    BankAccount, CashAccount, Check, IntegrityReport, OpenBankAccountInput, OpenCashAccountInput,
    TreasuryPosition,
};
use treasury_core::store::TreasuryStore;
use treasury_shared::types::{BankAccountId, CashAccountId, CheckId};

use crate::{AppState, ApiResult, Ctx};

/// Creates the account routes.
pub fn routes<S: TreasuryStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/cash-accounts", post(open_cash_account::<S>))
        .route("/cash-accounts/{account_id}", get(get_cash_account::<S>))
        .route("/bank-accounts", post(open_bank_account::<S>))
        .route("/bank-accounts/{account_id}", get(get_bank_account::<S>))
        .route("/checks/{check_id}", get(get_check::<S>))
        .route("/checks/{check_id}/clear", post(clear_check::<S>))
        .route("/checks/{check_id}/reject", post(reject_check::<S>))
        .route("/position", get(get_treasury_position::<S>))
        .route("/integrity", get(verify_integrity::<S>))
}

/// POST `/cash-accounts` - Open a cash drawer.
async fn open_cash_account<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Json(input): Json<OpenCashAccountInput>,
) -> ApiResult<(StatusCode, Json<CashAccount>)> {
    let account = state.engine.registry.open_cash_account(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET `/cash-accounts/{account_id}`
async fn get_cash_account<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(account_id): Path<CashAccountId>,
) -> ApiResult<Json<CashAccount>> {
    Ok(Json(state.engine.registry.cash_account(&ctx, account_id).await?))
}

/// POST `/bank-accounts` - Open a bank account.
async fn open_bank_account<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Json(input): Json<OpenBankAccountInput>,
) -> ApiResult<(StatusCode, Json<BankAccount>)> {
    let account = state.engine.registry.open_bank_account(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET `/bank-accounts/{account_id}`
async fn get_bank_account<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(account_id): Path<BankAccountId>,
) -> ApiResult<Json<BankAccount>> {
    Ok(Json(state.engine.registry.bank_account(&ctx, account_id).await?))
}

/// GET `/checks/{check_id}`
async fn get_check<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(check_id): Path<CheckId>,
) -> ApiResult<Json<Check>> {
    Ok(Json(state.engine.registry.check(&ctx, check_id).await?))
}

/// POST `/checks/{check_id}/clear` - The bank honoured a deposited check.
async fn clear_check<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(check_id): Path<CheckId>,
) -> ApiResult<Json<Check>> {
    Ok(Json(state.engine.registry.clear_check(&ctx, check_id).await?))
}

/// POST `/checks/{check_id}/reject` - The bank bounced a deposited check.
async fn reject_check<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
    Path(check_id): Path<CheckId>,
) -> ApiResult<Json<Check>> {
    Ok(Json(state.engine.registry.reject_check(&ctx, check_id).await?))
}

/// GET `/position` - Balances per account and per currency.
async fn get_treasury_position<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
) -> ApiResult<Json<TreasuryPosition>> {
    Ok(Json(state.engine.registry.get_treasury_position(&ctx).await?))
}

/// GET `/integrity` - Compare stored balances with their movements.
async fn verify_integrity<S: TreasuryStore>(
    State(state): State<AppState<S>>,
    Ctx(ctx): Ctx,
) -> ApiResult<Json<IntegrityReport>> {
    Ok(Json(state.engine.registry.verify_integrity(&ctx).await?))
}
