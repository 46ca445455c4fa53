//! Reversal manager.
//!
//! A reversal never edits or deletes the original movement. It flips the
//! original CONFIRMED → REVERSED with a compare-and-set, then records an
//! offsetting movement through the ledger in the same unit of work.

use std::sync::Arc;

use chrono::Utc;
use treasury_shared::types::MovementId;

use crate::context::OperationContext;
use crate::error::{TreasuryError, TreasuryResult};
use crate::ledger::posting;
use crate::ledger::types::{
    AccountRef, Direction, DocumentRef, Movement, MovementState, RecordMovementInput,
};
use crate::registry::service::move_check;
use crate::registry::types::CheckState;
use crate::store::{TreasuryStore, TreasuryTx};

fn require_reason(reason: &str) -> TreasuryResult<&str> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(TreasuryError::ReversalReasonRequired);
    }
    Ok(reason)
}

/// Reverses one movement inside `tx`, returning the offsetting movement.
///
/// # Errors
///
/// Returns `MovementNotFound`, `CannotReverseReversal`,
/// `MovementNotConfirmed`, `AlreadyReversed` (also when a concurrent
/// reversal wins the compare-and-set) or `CheckStateConflict` when a check
/// cannot move back.
pub async fn reverse_in<T: TreasuryTx>(
    tx: &mut T,
    ctx: &OperationContext,
    movement_id: MovementId,
    reason: &str,
) -> TreasuryResult<Movement> {
    let original = tx
        .movement(ctx.company_id, movement_id)
        .await?
        .ok_or(TreasuryError::MovementNotFound(movement_id))?;

    if original.is_reversal() {
        return Err(TreasuryError::CannotReverseReversal(movement_id));
    }
    match original.state {
        MovementState::Reversed => return Err(TreasuryError::AlreadyReversed(movement_id)),
        MovementState::Pending => return Err(TreasuryError::MovementNotConfirmed(movement_id)),
        MovementState::Confirmed => {}
    }

    let input = RecordMovementInput::new(
        original.target,
        original.direction.opposite(),
        original.medium,
        original.amount,
        &original.currency,
        Utc::now().date_naive(),
    )
    .with_description(format!("Reversal: {reason}"))
    .with_document(original.document.clone());
    let mut offset = posting::prepare(tx, ctx, input).await?;
    offset.reversal_of_id = Some(original.id);

    if !tx
        .mark_movement_reversed(ctx.company_id, original.id, offset.id)
        .await?
    {
        tracing::warn!(
            company_id = %ctx.company_id,
            movement_id = %movement_id,
            "Reversal lost compare-and-set, movement already reversed"
        );
        return Err(TreasuryError::AlreadyReversed(movement_id));
    }
    posting::post(tx, &offset).await?;

    if let AccountRef::Check(check_id) = original.target {
        match original.direction {
            // The payment that brought the check in is undone
            Direction::Inflow => {
                move_check(
                    tx,
                    ctx.company_id,
                    check_id,
                    CheckState::Custody,
                    CheckState::Returned,
                    None,
                )
                .await?;
            }
            // The deposit that took the check out is undone
            Direction::Outflow => {
                let back = tx
                    .transition_check(
                        ctx.company_id,
                        check_id,
                        CheckState::Deposited,
                        CheckState::Custody,
                        None,
                    )
                    .await?
                    || tx
                        .transition_check(
                            ctx.company_id,
                            check_id,
                            CheckState::Rejected,
                            CheckState::Custody,
                            None,
                        )
                        .await?;
                if !back {
                    let check = tx
                        .check(ctx.company_id, check_id)
                        .await?
                        .ok_or(TreasuryError::CheckNotFound(check_id))?;
                    return Err(TreasuryError::CheckStateConflict {
                        check_id,
                        expected: CheckState::Deposited,
                        actual: check.state,
                    });
                }
            }
        }
    }

    Ok(offset)
}

/// Reverses movements and whole documents.
pub struct ReversalService<S: TreasuryStore> {
    store: Arc<S>,
}

impl<S: TreasuryStore> ReversalService<S> {
    /// Creates a new reversal service.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Reverses a CONFIRMED movement.
    ///
    /// The offset has the same target, amount, currency and document, the
    /// opposite direction, and `reversal_of_id` pointing at the original.
    /// Check targets move custody back: a reversed inflow returns the check
    /// (CUSTODY → RETURNED), a reversed deposit brings it back into custody.
    ///
    /// # Errors
    ///
    /// Returns `ReversalReasonRequired` for a blank reason, plus the errors
    /// of [`reverse_in`].
    pub async fn reverse(
        &self,
        ctx: &OperationContext,
        movement_id: MovementId,
        reason: &str,
    ) -> TreasuryResult<Movement> {
        let reason = require_reason(reason)?;

        let mut tx = self.store.begin().await?;
        let offset = reverse_in(&mut tx, ctx, movement_id, reason).await?;
        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            movement_id = %movement_id,
            reversal_id = %offset.id,
            amount = %offset.amount,
            reason,
            "Movement reversed"
        );
        Ok(offset)
    }

    /// Reverses every still-CONFIRMED movement of a document.
    ///
    /// Reversal movements, already reversed movements and pending movements
    /// are skipped. All reversals commit together.
    ///
    /// # Errors
    ///
    /// Returns `ReversalReasonRequired`, `DocumentNotFound` if the document
    /// has no movements, or the first error of [`reverse_in`].
    pub async fn reverse_all_for_document(
        &self,
        ctx: &OperationContext,
        document: &DocumentRef,
        reason: &str,
    ) -> TreasuryResult<Vec<Movement>> {
        let reason = require_reason(reason)?;

        let mut tx = self.store.begin().await?;
        let movements = tx.movements_for_document(ctx.company_id, document).await?;
        if movements.is_empty() {
            return Err(TreasuryError::DocumentNotFound(document.clone()));
        }

        let mut offsets = Vec::new();
        for movement in movements
            .iter()
            .filter(|m| m.state == MovementState::Confirmed && !m.is_reversal())
        {
            offsets.push(reverse_in(&mut tx, ctx, movement.id, reason).await?);
        }
        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            document = %document,
            reversed = offsets.len(),
            skipped = movements.len() - offsets.len(),
            reason,
            "Document reversed"
        );
        Ok(offsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_reverse_restores_balance() {
        let fx = Fixture::new().await;
        fx.record(AccountRef::Cash(fx.cash.id), Direction::Inflow, dec!(40)).await;
        let original = fx
            .record(AccountRef::Cash(fx.cash.id), Direction::Inflow, dec!(100))
            .await;

        let offset = fx
            .reversal()
            .reverse(&fx.ctx, original.id, "Duplicate receipt")
            .await
            .unwrap();

        assert_eq!(offset.direction, Direction::Outflow);
        assert_eq!(offset.amount, dec!(100));
        assert_eq!(offset.reversal_of_id, Some(original.id));
        assert_eq!(offset.state, MovementState::Confirmed);

        let stored = fx.movement(original.id).await;
        assert_eq!(stored.state, MovementState::Reversed);
        assert_eq!(stored.reversed_by_id, Some(offset.id));
        assert_eq!(fx.cash_balance().await, dec!(40));
    }

    #[tokio::test]
    async fn test_reverse_twice_fails() {
        let fx = Fixture::new().await;
        let original = fx
            .record(AccountRef::Bank(fx.bank.id), Direction::Outflow, dec!(75))
            .await;
        let offset = fx.reversal().reverse(&fx.ctx, original.id, "wrong").await.unwrap();

        let again = fx.reversal().reverse(&fx.ctx, original.id, "wrong").await;
        assert!(matches!(again, Err(TreasuryError::AlreadyReversed(id)) if id == original.id));

        let of_offset = fx.reversal().reverse(&fx.ctx, offset.id, "undo").await;
        assert!(matches!(of_offset, Err(TreasuryError::CannotReverseReversal(_))));
        assert_eq!(fx.bank_balance().await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_reverse_requires_reason_and_confirmation() {
        let fx = Fixture::new().await;
        let pending = fx
            .ledger()
            .record_movement(
                &fx.ctx,
                fx.input(AccountRef::Bank(fx.bank.id), Direction::Inflow, dec!(10))
                    .with_state(MovementState::Pending),
            )
            .await
            .unwrap();

        assert!(matches!(
            fx.reversal().reverse(&fx.ctx, pending.id, "   ").await,
            Err(TreasuryError::ReversalReasonRequired)
        ));
        assert!(matches!(
            fx.reversal().reverse(&fx.ctx, pending.id, "bounced").await,
            Err(TreasuryError::MovementNotConfirmed(_))
        ));
        assert!(matches!(
            fx.reversal().reverse(&fx.ctx, MovementId::new(), "typo").await,
            Err(TreasuryError::MovementNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reverse_document_cash_and_check_payment() {
        let fx = Fixture::new().await;
        let mut input = fx.payment_input("PAY-100", dec!(1000));
        input.cash_amount = dec!(600);
        input.checks = vec![crate::composer::types::CheckLegInput {
            number: "123".to_string(),
            bank_name: "Second Bank".to_string(),
            issuer: "ACME".to_string(),
            amount: dec!(400),
            due_date: None,
        }];
        let payment = fx
            .composer()
            .create_client_payment_movements(&fx.ctx, input)
            .await
            .unwrap();
        let document = DocumentRef::new("PAYMENT", "PAY-100");

        let offsets = fx
            .reversal()
            .reverse_all_for_document(&fx.ctx, &document, "Payment cancelled")
            .await
            .unwrap();

        assert_eq!(offsets.len(), 2);
        assert_eq!(
            offsets.iter().map(Movement::signed_amount).sum::<Decimal>(),
            dec!(-1000)
        );
        for original in &payment.movements {
            assert_eq!(fx.movement(original.id).await.state, MovementState::Reversed);
        }
        let drawer = fx.cash_account().await;
        assert_eq!(drawer.balance, dec!(0));
        assert_eq!(drawer.portfolio_balance, dec!(0));
        assert_eq!(fx.check(payment.check_ids[0]).await.state, CheckState::Returned);

        // Nothing left to reverse: reversals and reversed originals are skipped
        let again = fx
            .reversal()
            .reverse_all_for_document(&fx.ctx, &document, "again")
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_reverse_document_skips_pending_transfer() {
        let fx = Fixture::new().await;
        let mut input = fx.payment_input("PAY-200", dec!(300));
        input.cash_amount = dec!(100);
        input.transfer_amount = dec!(200);
        input.bank_account_id = Some(fx.bank.id);
        fx.composer()
            .create_client_payment_movements(&fx.ctx, input)
            .await
            .unwrap();

        let offsets = fx
            .reversal()
            .reverse_all_for_document(&fx.ctx, &DocumentRef::new("PAYMENT", "PAY-200"), "void")
            .await
            .unwrap();

        assert_eq!(offsets.len(), 1);
        assert!(matches!(offsets[0].target, AccountRef::Cash(_)));
    }

    #[tokio::test]
    async fn test_reverse_unknown_document() {
        let fx = Fixture::new().await;
        let result = fx
            .reversal()
            .reverse_all_for_document(&fx.ctx, &DocumentRef::new("PAYMENT", "nope"), "void")
            .await;
        assert!(matches!(result, Err(TreasuryError::DocumentNotFound(_))));
    }

    #[tokio::test]
    async fn test_reversing_deposit_brings_checks_back() {
        let fx = Fixture::new().await;
        let check_id = fx.receive_check(dec!(400)).await;
        let mut deposit = fx.deposit_input(vec![check_id]);
        let document = deposit.document.clone();
        deposit.description = "Morning deposit".to_string();
        fx.composer().create_cash_deposit(&fx.ctx, deposit).await.unwrap();
        fx.registry().reject_check(&fx.ctx, check_id).await.unwrap();

        fx.reversal()
            .reverse_all_for_document(&fx.ctx, &document, "Check bounced")
            .await
            .unwrap();

        let check = fx.check(check_id).await;
        assert_eq!(check.state, CheckState::Custody);
        assert_eq!(check.deposited_into, None);
        assert_eq!(fx.cash_account().await.portfolio_balance, dec!(400));
        assert_eq!(fx.bank_balance().await, dec!(0));
    }

    #[tokio::test]
    async fn test_reversing_check_payment_after_deposit_conflicts() {
        let fx = Fixture::new().await;
        let check_id = fx.receive_check(dec!(400)).await;
        fx.deposit_checks(vec![check_id]).await;
        let inflow = fx
            .all_movements()
            .await
            .into_iter()
            .find(|m| m.target == AccountRef::Check(check_id) && m.direction == Direction::Inflow)
            .unwrap();

        let result = fx.reversal().reverse(&fx.ctx, inflow.id, "cancel").await;

        assert!(matches!(
            result,
            Err(TreasuryError::CheckStateConflict {
                actual: CheckState::Deposited,
                ..
            })
        ));
        assert_eq!(fx.movement(inflow.id).await.state, MovementState::Confirmed);
    }
}
