//! Ledger service: single movements and pending confirmation.

use std::sync::Arc;

use treasury_shared::types::MovementId;

use super::posting;
use super::types::{DocumentRef, Movement, MovementState, RecordMovementInput};
use crate::context::OperationContext;
use crate::error::{TreasuryError, TreasuryResult};
use crate::store::{TreasuryStore, TreasuryTx};

/// Records movements and applies their balance effect.
///
/// Each call is one unit of work: the movement row and its balance delta
/// commit together or not at all.
pub struct LedgerService<S: TreasuryStore> {
    store: Arc<S>,
}

impl<S: TreasuryStore> LedgerService<S> {
    /// Creates a new ledger service.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Records one movement.
    ///
    /// A CONFIRMED movement applies `+amount` (inflow) or `-amount` (outflow)
    /// to exactly one balance; a PENDING one is stored without effect.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Not exactly one target is given
    /// - Amount is zero or negative
    /// - The target does not exist
    /// - The currency differs from the target's
    pub async fn record_movement(
        &self,
        ctx: &OperationContext,
        input: RecordMovementInput,
    ) -> TreasuryResult<Movement> {
        let mut tx = self.store.begin().await?;
        let movement = posting::record(&mut tx, ctx, input).await?;
        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            movement_id = %movement.id,
            target = %movement.target,
            direction = %movement.direction,
            amount = %movement.amount,
            state = %movement.state,
            "Movement recorded"
        );
        Ok(movement)
    }

    /// Confirms a PENDING movement and applies its balance effect once.
    ///
    /// # Errors
    ///
    /// Returns `MovementNotFound`, or `MovementNotPending` if the movement was
    /// already confirmed (including by a concurrent caller).
    pub async fn confirm_pending(
        &self,
        ctx: &OperationContext,
        movement_id: MovementId,
    ) -> TreasuryResult<Movement> {
        let mut tx = self.store.begin().await?;
        let mut movement = tx
            .movement(ctx.company_id, movement_id)
            .await?
            .ok_or(TreasuryError::MovementNotFound(movement_id))?;

        if !tx.confirm_movement(ctx.company_id, movement_id).await? {
            tracing::warn!(
                company_id = %ctx.company_id,
                movement_id = %movement_id,
                state = %movement.state,
                "Confirmation rejected, movement is not pending"
            );
            return Err(TreasuryError::MovementNotPending(movement_id));
        }
        movement.state = MovementState::Confirmed;
        posting::apply_effect(&mut tx, &movement).await?;
        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            movement_id = %movement.id,
            amount = %movement.amount,
            "Pending movement confirmed"
        );
        Ok(movement)
    }

    /// Gets a movement by ID.
    ///
    /// # Errors
    ///
    /// Returns `MovementNotFound` if it does not exist.
    pub async fn movement(
        &self,
        ctx: &OperationContext,
        movement_id: MovementId,
    ) -> TreasuryResult<Movement> {
        let mut tx = self.store.begin().await?;
        tx.movement(ctx.company_id, movement_id)
            .await?
            .ok_or(TreasuryError::MovementNotFound(movement_id))
    }

    /// Lists the movements of a document.
    ///
    /// # Errors
    ///
    /// Returns storage errors only; an unknown document yields an empty list.
    pub async fn movements_for_document(
        &self,
        ctx: &OperationContext,
        document: &DocumentRef,
    ) -> TreasuryResult<Vec<Movement>> {
        let mut tx = self.store.begin().await?;
        tx.movements_for_document(ctx.company_id, document).await
    }
}
