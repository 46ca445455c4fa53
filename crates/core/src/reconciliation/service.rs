//! Reconciliation service: statement import, auto-match, manual match, unmatch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use treasury_shared::ReconciliationConfig;
use treasury_shared::types::{MovementId, StatementId, StatementItemId};

use super::matcher::{assign, score_pairs};
use super::strategy::{MatchStrategy, default_strategies};
use super::types::{
    AutoMatchReport, BankStatement, ImportStatementInput, ImportedStatement, ItemStatus,
    MatchOutcome, MatchType, StatementItem, StatementSummary,
};
use crate::context::OperationContext;
use crate::error::{TreasuryError, TreasuryResult};
use crate::ledger::types::{AccountKind, AccountRef, MovementState};
use crate::store::{TreasuryStore, TreasuryTx};

/// Locks a statement line's statement header, then loads the line under
/// that lock.
pub(crate) async fn lock_item<T: TreasuryTx>(
    tx: &mut T,
    ctx: &OperationContext,
    item_id: StatementItemId,
) -> TreasuryResult<StatementItem> {
    let statement_id = tx
        .statement_item(ctx.company_id, item_id)
        .await?
        .ok_or(TreasuryError::StatementItemNotFound(item_id))?
        .statement_id;
    tx.lock_statement(ctx.company_id, statement_id)
        .await?
        .ok_or(TreasuryError::StatementNotFound(statement_id))?;
    // Another writer may have committed while we waited on the lock.
    tx.statement_item(ctx.company_id, item_id)
        .await?
        .ok_or(TreasuryError::StatementItemNotFound(item_id))
}

/// Matches bank statement lines to bank movements.
pub struct ReconciliationService<S: TreasuryStore> {
    store: Arc<S>,
    config: ReconciliationConfig,
    strategies: Vec<Box<dyn MatchStrategy>>,
}

impl<S: TreasuryStore> ReconciliationService<S> {
    /// Creates a service using the EXACT, REFERENCE, FUZZY strategies.
    #[must_use]
    pub fn new(store: Arc<S>, config: ReconciliationConfig) -> Self {
        let strategies = default_strategies(&config);
        Self {
            store,
            config,
            strategies,
        }
    }

    /// Replaces the strategy list. Earlier strategies take priority.
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn MatchStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Imports a normalized statement; every line starts UNRECONCILED.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatementLine` for a line without exactly one
    /// positive side, or `AccountNotFound` for an unknown bank account.
    pub async fn import_statement(
        &self,
        ctx: &OperationContext,
        input: ImportStatementInput,
    ) -> TreasuryResult<ImportedStatement> {
        if let Some(line) = input.lines.iter().position(|l| !l.is_valid()) {
            return Err(TreasuryError::InvalidStatementLine { line });
        }

        let mut tx = self.store.begin().await?;
        tx.bank_account(ctx.company_id, input.bank_account_id)
            .await?
            .ok_or(TreasuryError::AccountNotFound(AccountRef::Bank(
                input.bank_account_id,
            )))?;

        let statement = BankStatement {
            id: StatementId::new(),
            company_id: ctx.company_id,
            bank_account_id: input.bank_account_id,
            period_start: input.period_start,
            period_end: input.period_end,
            imported_by: ctx.actor_id,
            imported_at: Utc::now(),
        };
        tx.insert_statement(&statement).await?;

        let mut items = Vec::with_capacity(input.lines.len());
        for line in input.lines {
            let item = StatementItem {
                id: StatementItemId::new(),
                company_id: ctx.company_id,
                statement_id: statement.id,
                bank_account_id: statement.bank_account_id,
                date: line.date,
                description: line.description,
                reference: line.reference,
                debit: line.debit,
                credit: line.credit,
                status: ItemStatus::Unreconciled,
                match_type: None,
                confidence: None,
                movement_id: None,
                suspense_note: None,
                reconciled_at: None,
                reconciled_by: None,
            };
            tx.insert_statement_item(&item).await?;
            items.push(item);
        }
        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            statement_id = %statement.id,
            bank_account_id = %statement.bank_account_id,
            lines = items.len(),
            "Bank statement imported"
        );
        Ok(ImportedStatement { statement, items })
    }

    /// Runs every strategy over the statement's UNRECONCILED lines and the
    /// bank account's unmatched CONFIRMED movements, then commits the greedy
    /// assignment above `min_auto_confidence`.
    ///
    /// The statement stays locked for the whole pass. A pair whose movement
    /// was reconciled concurrently is skipped, not failed.
    ///
    /// # Errors
    ///
    /// Returns `StatementNotFound` or a storage error.
    pub async fn auto_match(
        &self,
        ctx: &OperationContext,
        statement_id: StatementId,
    ) -> TreasuryResult<AutoMatchReport> {
        let mut tx = self.store.begin().await?;
        let statement = tx
            .lock_statement(ctx.company_id, statement_id)
            .await?
            .ok_or(TreasuryError::StatementNotFound(statement_id))?;

        let items: Vec<StatementItem> = tx
            .statement_items(ctx.company_id, statement_id)
            .await?
            .into_iter()
            .filter(|i| i.status == ItemStatus::Unreconciled)
            .collect();
        let movements = tx
            .unmatched_bank_movements(ctx.company_id, statement.bank_account_id)
            .await?;

        let candidates = score_pairs(&items, &movements, &self.strategies);
        tracing::debug!(
            statement_id = %statement_id,
            items = items.len(),
            movements = movements.len(),
            candidates = candidates.len(),
            "Scored reconciliation candidates"
        );

        let mut by_id: HashMap<StatementItemId, StatementItem> =
            items.iter().map(|i| (i.id, i.clone())).collect();
        let mut matched = Vec::new();
        let mut skipped = 0;
        for pick in assign(candidates, self.config.min_auto_confidence) {
            let Some(item) = by_id.get_mut(&pick.item_id) else {
                continue;
            };
            if !tx
                .set_reconciliation_marker(ctx.company_id, pick.movement_id, None, Some(item.id))
                .await?
            {
                tracing::warn!(
                    statement_id = %statement_id,
                    item_id = %pick.item_id,
                    movement_id = %pick.movement_id,
                    "Movement reconciled concurrently, pair skipped"
                );
                skipped += 1;
                continue;
            }
            item.reconcile(pick.movement_id, pick.match_type, pick.confidence, ctx.actor_id);
            tx.update_statement_item(item).await?;
            matched.push(MatchOutcome {
                item_id: pick.item_id,
                movement_id: pick.movement_id,
                match_type: pick.match_type,
                confidence: pick.confidence,
            });
        }
        tx.commit().await?;

        let report = AutoMatchReport {
            statement_id,
            candidates: items.len(),
            unmatched: items.len() - matched.len(),
            matched,
            skipped,
        };
        tracing::info!(
            company_id = %ctx.company_id,
            statement_id = %statement_id,
            matched = report.matched.len(),
            skipped = report.skipped,
            unmatched = report.unmatched,
            "Auto-match completed"
        );
        Ok(report)
    }

    /// Links a statement line to a movement chosen by a user.
    ///
    /// A SUSPENSE line becomes RECONCILED and keeps its note.
    ///
    /// # Errors
    ///
    /// Returns `StatementItemNotFound`, `MovementNotFound`,
    /// `AccountTypeMismatch` for a non-bank movement, `AccountMismatch` for
    /// another bank account, `ItemAlreadyReconciled`,
    /// `MovementAlreadyReconciled`, or `MovementNotConfirmed` for a PENDING
    /// movement.
    pub async fn manual_match(
        &self,
        ctx: &OperationContext,
        item_id: StatementItemId,
        movement_id: MovementId,
    ) -> TreasuryResult<StatementItem> {
        let mut tx = self.store.begin().await?;
        let mut item = lock_item(&mut tx, ctx, item_id).await?;
        let movement = tx
            .movement(ctx.company_id, movement_id)
            .await?
            .ok_or(TreasuryError::MovementNotFound(movement_id))?;

        let AccountRef::Bank(bank_account_id) = movement.target else {
            return Err(TreasuryError::AccountTypeMismatch {
                item: AccountKind::Bank,
                movement: movement.target.kind(),
            });
        };
        if bank_account_id != item.bank_account_id {
            return Err(TreasuryError::AccountMismatch {
                statement: item.bank_account_id,
                movement: bank_account_id,
            });
        }
        if item.status == ItemStatus::Reconciled {
            return Err(TreasuryError::ItemAlreadyReconciled(item_id));
        }
        if movement.reconciled_item_id.is_some() {
            return Err(TreasuryError::MovementAlreadyReconciled(movement_id));
        }
        if movement.state == MovementState::Pending {
            return Err(TreasuryError::MovementNotConfirmed(movement_id));
        }

        if !tx
            .set_reconciliation_marker(ctx.company_id, movement_id, None, Some(item_id))
            .await?
        {
            tracing::warn!(
                item_id = %item_id,
                movement_id = %movement_id,
                "Manual match lost compare-and-set"
            );
            return Err(TreasuryError::MovementAlreadyReconciled(movement_id));
        }
        item.reconcile(movement_id, MatchType::Manual, Decimal::ONE, ctx.actor_id);
        tx.update_statement_item(&item).await?;
        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            item_id = %item_id,
            movement_id = %movement_id,
            "Statement item matched manually"
        );
        Ok(item)
    }

    /// Returns a RECONCILED line to UNRECONCILED and frees its movement.
    ///
    /// Calling it on a line that is not RECONCILED changes nothing. Amounts
    /// and balances are never touched.
    ///
    /// # Errors
    ///
    /// Returns `StatementItemNotFound` or a storage error.
    pub async fn unmatch(
        &self,
        ctx: &OperationContext,
        item_id: StatementItemId,
    ) -> TreasuryResult<StatementItem> {
        let mut tx = self.store.begin().await?;
        let mut item = lock_item(&mut tx, ctx, item_id).await?;
        if item.status != ItemStatus::Reconciled {
            return Ok(item);
        }

        if let Some(movement_id) = item.movement_id
            && !tx
                .set_reconciliation_marker(ctx.company_id, movement_id, Some(item_id), None)
                .await?
        {
            tracing::warn!(
                item_id = %item_id,
                movement_id = %movement_id,
                "Movement marker did not point at this item"
            );
        }
        let movement_id = item.movement_id;
        item.clear_match();
        tx.update_statement_item(&item).await?;
        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            item_id = %item_id,
            movement_id = ?movement_id,
            "Statement item unmatched"
        );
        Ok(item)
    }

    /// Counts a statement's lines by status.
    ///
    /// # Errors
    ///
    /// Returns `StatementNotFound` or a storage error.
    pub async fn statement_summary(
        &self,
        ctx: &OperationContext,
        statement_id: StatementId,
    ) -> TreasuryResult<StatementSummary> {
        let items = self.statement_items(ctx, statement_id).await?;
        Ok(StatementSummary::from_items(statement_id, &items))
    }

    /// Lists a statement's lines ordered by date.
    ///
    /// # Errors
    ///
    /// Returns `StatementNotFound` or a storage error.
    pub async fn statement_items(
        &self,
        ctx: &OperationContext,
        statement_id: StatementId,
    ) -> TreasuryResult<Vec<StatementItem>> {
        let mut tx = self.store.begin().await?;
        tx.statement(ctx.company_id, statement_id)
            .await?
            .ok_or(TreasuryError::StatementNotFound(statement_id))?;
        tx.statement_items(ctx.company_id, statement_id).await
    }
}
