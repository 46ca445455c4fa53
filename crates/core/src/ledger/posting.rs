//! In-transaction ledger primitives.
//!
//! These functions never open or commit a unit of work; composed operations
//! call them on their own transaction so every leg lands or none does.

use chrono::Utc;
use rust_decimal::Decimal;
use treasury_shared::types::{CompanyId, MovementId};

use super::types::{AccountRef, Movement, MovementState, RecordMovementInput};
use crate::context::OperationContext;
use crate::error::{TreasuryError, TreasuryResult};
use crate::registry::types::BalanceTarget;
use crate::store::TreasuryTx;

/// Resolves the materialized balance behind a target and its currency.
///
/// # Errors
///
/// Returns `AccountNotFound` if the account or check does not exist.
pub async fn resolve_target<T: TreasuryTx>(
    tx: &mut T,
    company_id: CompanyId,
    target: AccountRef,
) -> TreasuryResult<(BalanceTarget, String)> {
    let resolved = match target {
        AccountRef::Cash(id) => tx
            .cash_account(company_id, id)
            .await?
            .map(|a| (BalanceTarget::CashDrawer(a.id), a.currency)),
        AccountRef::Bank(id) => tx
            .bank_account(company_id, id)
            .await?
            .map(|a| (BalanceTarget::Bank(a.id), a.currency)),
        AccountRef::Check(id) => tx
            .check(company_id, id)
            .await?
            .map(|c| (BalanceTarget::Portfolio(c.custody_account_id), c.currency)),
    };
    resolved.ok_or(TreasuryError::AccountNotFound(target))
}

/// Validates an input and builds the movement without writing anything.
///
/// # Errors
///
/// Returns `InvalidTarget`, `NonPositiveAmount`, `AccountNotFound` or
/// `CurrencyMismatch`, in that order of precedence.
pub async fn prepare<T: TreasuryTx>(
    tx: &mut T,
    ctx: &OperationContext,
    input: RecordMovementInput,
) -> TreasuryResult<Movement> {
    let target = AccountRef::from_parts(input.cash_account_id, input.bank_account_id, input.check_id)?;

    if input.amount <= Decimal::ZERO {
        return Err(TreasuryError::NonPositiveAmount(input.amount));
    }

    if input.state == MovementState::Reversed {
        return Err(TreasuryError::InvalidInitialState(input.state));
    }

    let (_, currency) = resolve_target(tx, ctx.company_id, target).await?;
    if !currency.eq_ignore_ascii_case(&input.currency) {
        return Err(TreasuryError::CurrencyMismatch {
            expected: currency,
            actual: input.currency,
        });
    }

    Ok(Movement {
        id: MovementId::new(),
        company_id: ctx.company_id,
        date: input.date,
        value_date: input.value_date,
        direction: input.direction,
        medium: input.medium,
        amount: input.amount,
        currency,
        target,
        description: input.description,
        document: input.document,
        state: input.state,
        reversal_of_id: None,
        reversed_by_id: None,
        reconciled_item_id: None,
        created_by: ctx.actor_id,
        created_at: Utc::now(),
    })
}

/// Applies a movement's signed amount to its balance as a relative delta.
///
/// # Errors
///
/// Returns `AccountNotFound` if the balance row is gone.
pub async fn apply_effect<T: TreasuryTx>(tx: &mut T, movement: &Movement) -> TreasuryResult<()> {
    let (balance, _) = resolve_target(tx, movement.company_id, movement.target).await?;
    if tx
        .apply_balance_delta(movement.company_id, balance, movement.signed_amount())
        .await?
    {
        Ok(())
    } else {
        Err(TreasuryError::AccountNotFound(movement.target))
    }
}

/// Persists a prepared movement, applying its balance effect if CONFIRMED.
///
/// # Errors
///
/// Returns storage errors, or `AccountNotFound` if the balance row is gone.
pub async fn post<T: TreasuryTx>(tx: &mut T, movement: &Movement) -> TreasuryResult<()> {
    tx.insert_movement(movement).await?;
    if movement.state == MovementState::Confirmed {
        apply_effect(tx, movement).await?;
    }
    Ok(())
}

/// Validates, persists and applies one movement inside `tx`.
///
/// # Errors
///
/// See [`prepare`] and [`post`].
pub async fn record<T: TreasuryTx>(
    tx: &mut T,
    ctx: &OperationContext,
    input: RecordMovementInput,
) -> TreasuryResult<Movement> {
    let movement = prepare(tx, ctx, input).await?;
    post(tx, &movement).await?;
    Ok(movement)
}
