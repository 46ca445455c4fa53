//! Suspense handler.
//!
//! Parks statement lines nobody could match. A parked line stays visible,
//! does not block the rest of the statement, and can still be matched later.

use std::sync::Arc;

use chrono::NaiveDate;
use treasury_shared::ReconciliationConfig;
use treasury_shared::types::{StatementId, StatementItemId};

use crate::context::OperationContext;
use crate::error::{TreasuryError, TreasuryResult};
use crate::reconciliation::service::lock_item;
use crate::reconciliation::types::{ItemStatus, StatementItem};
use crate::store::{TreasuryStore, TreasuryTx};

/// Parks unmatched statement lines.
pub struct SuspenseService<S: TreasuryStore> {
    store: Arc<S>,
    config: ReconciliationConfig,
}

impl<S: TreasuryStore> SuspenseService<S> {
    /// Creates a new suspense service.
    #[must_use]
    pub fn new(store: Arc<S>, config: ReconciliationConfig) -> Self {
        Self { store, config }
    }

    /// Moves a line to SUSPENSE with an operator note.
    ///
    /// Marking a line that is already parked replaces its note.
    ///
    /// # Errors
    ///
    /// Returns `SuspenseNoteRequired` for a blank note,
    /// `StatementItemNotFound`, or `ItemAlreadyReconciled`.
    pub async fn mark_suspense(
        &self,
        ctx: &OperationContext,
        item_id: StatementItemId,
        note: &str,
    ) -> TreasuryResult<StatementItem> {
        let note = note.trim();
        if note.is_empty() {
            return Err(TreasuryError::SuspenseNoteRequired);
        }

        let mut tx = self.store.begin().await?;
        let mut item = lock_item(&mut tx, ctx, item_id).await?;
        if item.status == ItemStatus::Reconciled {
            return Err(TreasuryError::ItemAlreadyReconciled(item_id));
        }
        item.status = ItemStatus::Suspense;
        item.suspense_note = Some(note.to_string());
        tx.update_statement_item(&item).await?;
        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            item_id = %item_id,
            note,
            "Statement item parked in suspense"
        );
        Ok(item)
    }

    /// Parks every UNRECONCILED line older than the grace period.
    ///
    /// A line dated `d` is parked when `as_of - d` exceeds
    /// `suspense_grace_days`. Returns the lines that were parked.
    ///
    /// # Errors
    ///
    /// Returns `StatementNotFound` or a storage error.
    pub async fn sweep_suspense(
        &self,
        ctx: &OperationContext,
        statement_id: StatementId,
        as_of: NaiveDate,
    ) -> TreasuryResult<Vec<StatementItem>> {
        let mut tx = self.store.begin().await?;
        tx.lock_statement(ctx.company_id, statement_id)
            .await?
            .ok_or(TreasuryError::StatementNotFound(statement_id))?;

        let grace = self.config.suspense_grace_days;
        let mut parked = Vec::new();
        for mut item in tx.statement_items(ctx.company_id, statement_id).await? {
            let age = (as_of - item.date).num_days();
            if item.status != ItemStatus::Unreconciled || age <= grace {
                continue;
            }
            item.status = ItemStatus::Suspense;
            item.suspense_note = Some(format!(
                "No match found within {grace} days (swept {as_of})"
            ));
            tx.update_statement_item(&item).await?;
            parked.push(item);
        }
        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            statement_id = %statement_id,
            as_of = %as_of,
            parked = parked.len(),
            "Suspense sweep completed"
        );
        Ok(parked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{AccountRef, Direction};
    use crate::reconciliation::types::{ImportStatementInput, StatementLineInput};
    use crate::testing::{Fixture, date};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn import_one(fx: &Fixture, on: NaiveDate, amount: Decimal) -> (StatementId, StatementItemId) {
        let imported = fx
            .reconciliation()
            .import_statement(
                &fx.ctx,
                ImportStatementInput {
                    bank_account_id: fx.bank.id,
                    period_start: date(2024, 3, 1),
                    period_end: date(2024, 3, 31),
                    lines: vec![StatementLineInput {
                        date: on,
                        description: "UNKNOWN CREDIT".to_string(),
                        reference: None,
                        debit: Decimal::ZERO,
                        credit: amount,
                    }],
                },
            )
            .await
            .unwrap();
        (imported.statement.id, imported.items[0].id)
    }

    #[tokio::test]
    async fn test_mark_requires_note() {
        let fx = Fixture::new().await;
        let (_, item_id) = import_one(&fx, date(2024, 3, 10), dec!(10)).await;

        let result = fx.suspense().mark_suspense(&fx.ctx, item_id, "   ").await;
        assert!(matches!(result, Err(TreasuryError::SuspenseNoteRequired)));
    }

    #[tokio::test]
    async fn test_mark_and_remark_updates_note() {
        let fx = Fixture::new().await;
        let (statement_id, item_id) = import_one(&fx, date(2024, 3, 10), dec!(10)).await;
        let service = fx.suspense();

        service.mark_suspense(&fx.ctx, item_id, "ask the bank").await.unwrap();
        let item = service
            .mark_suspense(&fx.ctx, item_id, "bank says duplicate")
            .await
            .unwrap();

        assert_eq!(item.status, ItemStatus::Suspense);
        assert_eq!(item.suspense_note.as_deref(), Some("bank says duplicate"));

        let summary = fx
            .reconciliation()
            .statement_summary(&fx.ctx, statement_id)
            .await
            .unwrap();
        assert_eq!(summary.suspense, 1);
        assert!(summary.is_resolved);
        assert!(!summary.is_fully_reconciled);
    }

    #[tokio::test]
    async fn test_mark_reconciled_item_fails() {
        let fx = Fixture::new().await;
        fx.record(AccountRef::Bank(fx.bank.id), Direction::Inflow, dec!(5000))
            .await;
        let (statement_id, item_id) = import_one(&fx, date(2024, 3, 10), dec!(5000)).await;
        fx.reconciliation().auto_match(&fx.ctx, statement_id).await.unwrap();

        let result = fx.suspense().mark_suspense(&fx.ctx, item_id, "why").await;
        assert!(matches!(result, Err(TreasuryError::ItemAlreadyReconciled(_))));
    }

    #[tokio::test]
    async fn test_sweep_respects_grace_period() {
        let fx = Fixture::new().await;
        fx.record(AccountRef::Bank(fx.bank.id), Direction::Inflow, dec!(5000))
            .await;
        let (statement_id, item_id) = import_one(&fx, date(2024, 3, 25), dec!(5000)).await;

        let report = fx.reconciliation().auto_match(&fx.ctx, statement_id).await.unwrap();
        assert_eq!(report.unmatched, 1);

        let service = fx.suspense();
        let parked = service
            .sweep_suspense(&fx.ctx, statement_id, date(2024, 4, 24))
            .await
            .unwrap();
        assert!(parked.is_empty());

        let parked = service
            .sweep_suspense(&fx.ctx, statement_id, date(2024, 4, 25))
            .await
            .unwrap();
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].id, item_id);
        assert_eq!(parked[0].status, ItemStatus::Suspense);
        assert!(parked[0].suspense_note.is_some());
    }

    #[tokio::test]
    async fn test_sweep_leaves_reconciled_and_parked_lines() {
        let fx = Fixture::new().await;
        let (statement_id, item_id) = import_one(&fx, date(2024, 1, 5), dec!(10)).await;
        fx.suspense()
            .mark_suspense(&fx.ctx, item_id, "manual note")
            .await
            .unwrap();

        let parked = fx
            .suspense()
            .sweep_suspense(&fx.ctx, statement_id, date(2024, 6, 1))
            .await
            .unwrap();
        assert!(parked.is_empty());

        let items = fx
            .reconciliation()
            .statement_items(&fx.ctx, statement_id)
            .await
            .unwrap();
        assert_eq!(items[0].suspense_note.as_deref(), Some("manual note"));
    }

    #[tokio::test]
    async fn test_sweep_unknown_statement() {
        let fx = Fixture::new().await;
        let result = fx
            .suspense()
            .sweep_suspense(&fx.ctx, StatementId::new(), date(2024, 6, 1))
            .await;
        assert!(matches!(result, Err(TreasuryError::StatementNotFound(_))));
    }
}
