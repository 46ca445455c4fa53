//! Postgres implementation of the treasury unit of work.
//!
//! Every [`SeaOrmTx`] wraps one database transaction. Balances move with
//! `UPDATE ... SET balance = balance + $delta`; state transitions are
//! conditional updates whose affected-row count decides the outcome.

mod convert;

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use treasury_core::composer::types::{CashClosing, ClosingState};
use treasury_core::ledger::types::{DocumentRef, Movement, MovementState};
use treasury_core::reconciliation::types::{BankStatement, StatementItem};
use treasury_core::registry::types::{
    BalanceTarget, BankAccount, CashAccount, Check, CheckState,
};
use treasury_core::store::{TreasuryStore, TreasuryTx};
use treasury_core::{TreasuryError, TreasuryResult};
use treasury_shared::types::{
    ActorId, BankAccountId, CashAccountId, CashClosingId, CheckId, CompanyId, MovementId,
    StatementId, StatementItemId,
};

use crate::entities::{
    bank_accounts, bank_statement_items, bank_statements, cash_accounts, cash_closings, checks,
    movements,
};
use convert::{
    bank_account_row, cash_account_row, check_row, closing_row, item_row, movement_row,
    statement_row,
};

#[allow(clippy::needless_pass_by_value)]
fn db(e: DbErr) -> TreasuryError {
    TreasuryError::Database(e.to_string())
}

/// Maps a unique violation of `index` to `conflict`; anything else stays a
/// storage error. The violation aborts the Postgres transaction, so the
/// conflicting row cannot be read back here.
fn unique_or_db(
    index: &'static str,
    conflict: impl FnOnce() -> TreasuryError,
) -> impl FnOnce(DbErr) -> TreasuryError {
    move |e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) if message.contains(index) => {
            tracing::debug!(index, "Unique index rejected a concurrent write");
            conflict()
        }
        _ => db(e),
    }
}

/// [`TreasuryStore`] backed by a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStore {
    /// Creates a store over a connection pool.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TreasuryStore for SeaOrmStore {
    type Tx = SeaOrmTx;

    async fn begin(&self) -> TreasuryResult<SeaOrmTx> {
        let txn = self.db.begin().await.map_err(db)?;
        Ok(SeaOrmTx { txn })
    }
}

/// One database transaction. Dropping it without commit rolls back.
pub struct SeaOrmTx {
    txn: DatabaseTransaction,
}

impl TreasuryTx for SeaOrmTx {
    // ========== Accounts ==========

    async fn insert_cash_account(&mut self, account: &CashAccount) -> TreasuryResult<()> {
        cash_account_row(account).insert(&self.txn).await.map_err(db)?;
        Ok(())
    }

    async fn insert_bank_account(&mut self, account: &BankAccount) -> TreasuryResult<()> {
        bank_account_row(account).insert(&self.txn).await.map_err(db)?;
        Ok(())
    }

    async fn cash_account(
        &mut self,
        company_id: CompanyId,
        id: CashAccountId,
    ) -> TreasuryResult<Option<CashAccount>> {
        let row = cash_accounts::Entity::find_by_id(id.into_inner())
            .filter(cash_accounts::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.txn)
            .await
            .map_err(db)?;
        Ok(row.map(CashAccount::from))
    }

    async fn bank_account(
        &mut self,
        company_id: CompanyId,
        id: BankAccountId,
    ) -> TreasuryResult<Option<BankAccount>> {
        let row = bank_accounts::Entity::find_by_id(id.into_inner())
            .filter(bank_accounts::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.txn)
            .await
            .map_err(db)?;
        Ok(row.map(BankAccount::from))
    }

    async fn cash_accounts(&mut self, company_id: CompanyId) -> TreasuryResult<Vec<CashAccount>> {
        let rows = cash_accounts::Entity::find()
            .filter(cash_accounts::Column::CompanyId.eq(company_id.into_inner()))
            .order_by_asc(cash_accounts::Column::CreatedAt)
            .order_by_asc(cash_accounts::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db)?;
        Ok(rows.into_iter().map(CashAccount::from).collect())
    }

    async fn bank_accounts(&mut self, company_id: CompanyId) -> TreasuryResult<Vec<BankAccount>> {
        let rows = bank_accounts::Entity::find()
            .filter(bank_accounts::Column::CompanyId.eq(company_id.into_inner()))
            .order_by_asc(bank_accounts::Column::CreatedAt)
            .order_by_asc(bank_accounts::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db)?;
        Ok(rows.into_iter().map(BankAccount::from).collect())
    }

    async fn apply_balance_delta(
        &mut self,
        company_id: CompanyId,
        target: BalanceTarget,
        delta: Decimal,
    ) -> TreasuryResult<bool> {
        let result = match target {
            BalanceTarget::CashDrawer(id) => {
                cash_accounts::Entity::update_many()
                    .col_expr(
                        cash_accounts::Column::Balance,
                        Expr::col(cash_accounts::Column::Balance).add(delta),
                    )
                    .filter(cash_accounts::Column::Id.eq(id.into_inner()))
                    .filter(cash_accounts::Column::CompanyId.eq(company_id.into_inner()))
                    .exec(&self.txn)
                    .await
            }
            BalanceTarget::Portfolio(id) => {
                cash_accounts::Entity::update_many()
                    .col_expr(
                        cash_accounts::Column::PortfolioBalance,
                        Expr::col(cash_accounts::Column::PortfolioBalance).add(delta),
                    )
                    .filter(cash_accounts::Column::Id.eq(id.into_inner()))
                    .filter(cash_accounts::Column::CompanyId.eq(company_id.into_inner()))
                    .exec(&self.txn)
                    .await
            }
            BalanceTarget::Bank(id) => {
                bank_accounts::Entity::update_many()
                    .col_expr(
                        bank_accounts::Column::Balance,
                        Expr::col(bank_accounts::Column::Balance).add(delta),
                    )
                    .filter(bank_accounts::Column::Id.eq(id.into_inner()))
                    .filter(bank_accounts::Column::CompanyId.eq(company_id.into_inner()))
                    .exec(&self.txn)
                    .await
            }
        }
        .map_err(db)?;
        Ok(result.rows_affected > 0)
    }

    // ========== Checks ==========

    async fn insert_check(&mut self, check: &Check) -> TreasuryResult<()> {
        check_row(check).insert(&self.txn).await.map_err(db)?;
        Ok(())
    }

    async fn check(&mut self, company_id: CompanyId, id: CheckId) -> TreasuryResult<Option<Check>> {
        checks::Entity::find_by_id(id.into_inner())
            .filter(checks::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.txn)
            .await
            .map_err(db)?
            .map(Check::try_from)
            .transpose()
    }

    async fn checks(&mut self, company_id: CompanyId) -> TreasuryResult<Vec<Check>> {
        checks::Entity::find()
            .filter(checks::Column::CompanyId.eq(company_id.into_inner()))
            .order_by_asc(checks::Column::CreatedAt)
            .all(&self.txn)
            .await
            .map_err(db)?
            .into_iter()
            .map(Check::try_from)
            .collect()
    }

    async fn transition_check(
        &mut self,
        company_id: CompanyId,
        id: CheckId,
        from: CheckState,
        to: CheckState,
        deposited_into: Option<BankAccountId>,
    ) -> TreasuryResult<bool> {
        let result = checks::Entity::update_many()
            .col_expr(checks::Column::State, Expr::value(to.as_str()))
            .col_expr(
                checks::Column::DepositedInto,
                Expr::value(deposited_into.map(BankAccountId::into_inner)),
            )
            .filter(checks::Column::Id.eq(id.into_inner()))
            .filter(checks::Column::CompanyId.eq(company_id.into_inner()))
            .filter(checks::Column::State.eq(from.as_str()))
            .exec(&self.txn)
            .await
            .map_err(db)?;
        Ok(result.rows_affected > 0)
    }

    // ========== Movements ==========

    async fn insert_movement(&mut self, movement: &Movement) -> TreasuryResult<()> {
        let original = movement.reversal_of_id;
        movement_row(movement)
            .insert(&self.txn)
            .await
            .map_err(unique_or_db("idx_movements_reversal_of", || {
                original.map_or(
                    TreasuryError::ConcurrentModification,
                    TreasuryError::AlreadyReversed,
                )
            }))?;
        Ok(())
    }

    async fn movement(
        &mut self,
        company_id: CompanyId,
        id: MovementId,
    ) -> TreasuryResult<Option<Movement>> {
        movements::Entity::find_by_id(id.into_inner())
            .filter(movements::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.txn)
            .await
            .map_err(db)?
            .map(Movement::try_from)
            .transpose()
    }

    async fn movements_for_document(
        &mut self,
        company_id: CompanyId,
        document: &DocumentRef,
    ) -> TreasuryResult<Vec<Movement>> {
        movements::Entity::find()
            .filter(movements::Column::CompanyId.eq(company_id.into_inner()))
            .filter(movements::Column::ReferenceType.eq(document.reference_type.as_str()))
            .filter(movements::Column::ReferenceId.eq(document.reference_id.as_str()))
            .order_by_asc(movements::Column::CreatedAt)
            .order_by_asc(movements::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db)?
            .into_iter()
            .map(Movement::try_from)
            .collect()
    }

    async fn movements_for_company(
        &mut self,
        company_id: CompanyId,
    ) -> TreasuryResult<Vec<Movement>> {
        movements::Entity::find()
            .filter(movements::Column::CompanyId.eq(company_id.into_inner()))
            .order_by_asc(movements::Column::CreatedAt)
            .all(&self.txn)
            .await
            .map_err(db)?
            .into_iter()
            .map(Movement::try_from)
            .collect()
    }

    async fn unmatched_bank_movements(
        &mut self,
        company_id: CompanyId,
        bank_account_id: BankAccountId,
    ) -> TreasuryResult<Vec<Movement>> {
        movements::Entity::find()
            .filter(movements::Column::CompanyId.eq(company_id.into_inner()))
            .filter(movements::Column::BankAccountId.eq(bank_account_id.into_inner()))
            .filter(movements::Column::State.eq(MovementState::Confirmed.as_str()))
            .filter(movements::Column::ReconciledItemId.is_null())
            .order_by_asc(movements::Column::Date)
            .all(&self.txn)
            .await
            .map_err(db)?
            .into_iter()
            .map(Movement::try_from)
            .collect()
    }

    async fn confirm_movement(
        &mut self,
        company_id: CompanyId,
        id: MovementId,
    ) -> TreasuryResult<bool> {
        let result = movements::Entity::update_many()
            .col_expr(
                movements::Column::State,
                Expr::value(MovementState::Confirmed.as_str()),
            )
            .filter(movements::Column::Id.eq(id.into_inner()))
            .filter(movements::Column::CompanyId.eq(company_id.into_inner()))
            .filter(movements::Column::State.eq(MovementState::Pending.as_str()))
            .exec(&self.txn)
            .await
            .map_err(db)?;
        Ok(result.rows_affected > 0)
    }

    async fn mark_movement_reversed(
        &mut self,
        company_id: CompanyId,
        id: MovementId,
        reversed_by: MovementId,
    ) -> TreasuryResult<bool> {
        let result = movements::Entity::update_many()
            .col_expr(
                movements::Column::State,
                Expr::value(MovementState::Reversed.as_str()),
            )
            .col_expr(
                movements::Column::ReversedById,
                Expr::value(reversed_by.into_inner()),
            )
            .filter(movements::Column::Id.eq(id.into_inner()))
            .filter(movements::Column::CompanyId.eq(company_id.into_inner()))
            .filter(movements::Column::State.eq(MovementState::Confirmed.as_str()))
            .exec(&self.txn)
            .await
            .map_err(db)?;
        Ok(result.rows_affected > 0)
    }

    async fn set_reconciliation_marker(
        &mut self,
        company_id: CompanyId,
        id: MovementId,
        expected: Option<StatementItemId>,
        new: Option<StatementItemId>,
    ) -> TreasuryResult<bool> {
        let expected_filter = match expected {
            Some(item_id) => movements::Column::ReconciledItemId.eq(item_id.into_inner()),
            None => movements::Column::ReconciledItemId.is_null(),
        };
        let result = movements::Entity::update_many()
            .col_expr(
                movements::Column::ReconciledItemId,
                Expr::value(new.map(StatementItemId::into_inner)),
            )
            .filter(movements::Column::Id.eq(id.into_inner()))
            .filter(movements::Column::CompanyId.eq(company_id.into_inner()))
            .filter(expected_filter)
            .exec(&self.txn)
            .await
            .map_err(unique_or_db("idx_movements_reconciled_item", || {
                TreasuryError::MovementAlreadyReconciled(id)
            }))?;
        Ok(result.rows_affected > 0)
    }

    // ========== Cash closings ==========

    async fn insert_closing(&mut self, closing: &CashClosing) -> TreasuryResult<()> {
        // A retry finds the winner and reports ClosingPendingApproval.
        closing_row(closing)
            .insert(&self.txn)
            .await
            .map_err(unique_or_db("idx_cash_closings_pending", || {
                TreasuryError::ConcurrentModification
            }))?;
        Ok(())
    }

    async fn closing(
        &mut self,
        company_id: CompanyId,
        id: CashClosingId,
    ) -> TreasuryResult<Option<CashClosing>> {
        cash_closings::Entity::find_by_id(id.into_inner())
            .filter(cash_closings::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.txn)
            .await
            .map_err(db)?
            .map(CashClosing::try_from)
            .transpose()
    }

    async fn pending_closing(
        &mut self,
        company_id: CompanyId,
        cash_account_id: CashAccountId,
    ) -> TreasuryResult<Option<CashClosing>> {
        cash_closings::Entity::find()
            .filter(cash_closings::Column::CompanyId.eq(company_id.into_inner()))
            .filter(cash_closings::Column::CashAccountId.eq(cash_account_id.into_inner()))
            .filter(cash_closings::Column::State.eq(ClosingState::Pending.as_str()))
            .one(&self.txn)
            .await
            .map_err(db)?
            .map(CashClosing::try_from)
            .transpose()
    }

    async fn approve_closing(
        &mut self,
        company_id: CompanyId,
        id: CashClosingId,
        note: &str,
        adjustment_movement_id: Option<MovementId>,
        approved_by: ActorId,
    ) -> TreasuryResult<bool> {
        let result = cash_closings::Entity::update_many()
            .col_expr(
                cash_closings::Column::State,
                Expr::value(ClosingState::Approved.as_str()),
            )
            .col_expr(cash_closings::Column::Note, Expr::value(note))
            .col_expr(
                cash_closings::Column::AdjustmentMovementId,
                Expr::value(adjustment_movement_id.map(MovementId::into_inner)),
            )
            .col_expr(
                cash_closings::Column::ApprovedBy,
                Expr::value(approved_by.into_inner()),
            )
            .col_expr(cash_closings::Column::ApprovedAt, Expr::value(Utc::now()))
            .filter(cash_closings::Column::Id.eq(id.into_inner()))
            .filter(cash_closings::Column::CompanyId.eq(company_id.into_inner()))
            .filter(cash_closings::Column::State.eq(ClosingState::Pending.as_str()))
            .exec(&self.txn)
            .await
            .map_err(db)?;
        Ok(result.rows_affected > 0)
    }

    // ========== Bank statements ==========

    async fn insert_statement(&mut self, statement: &BankStatement) -> TreasuryResult<()> {
        statement_row(statement).insert(&self.txn).await.map_err(db)?;
        Ok(())
    }

    async fn insert_statement_item(&mut self, item: &StatementItem) -> TreasuryResult<()> {
        item_row(item).insert(&self.txn).await.map_err(db)?;
        Ok(())
    }

    async fn statement(
        &mut self,
        company_id: CompanyId,
        id: StatementId,
    ) -> TreasuryResult<Option<BankStatement>> {
        let row = bank_statements::Entity::find_by_id(id.into_inner())
            .filter(bank_statements::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.txn)
            .await
            .map_err(db)?;
        Ok(row.map(BankStatement::from))
    }

    async fn lock_statement(
        &mut self,
        company_id: CompanyId,
        id: StatementId,
    ) -> TreasuryResult<Option<BankStatement>> {
        let row = bank_statements::Entity::find_by_id(id.into_inner())
            .filter(bank_statements::Column::CompanyId.eq(company_id.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db)?;
        Ok(row.map(BankStatement::from))
    }

    async fn statement_items(
        &mut self,
        company_id: CompanyId,
        statement_id: StatementId,
    ) -> TreasuryResult<Vec<StatementItem>> {
        bank_statement_items::Entity::find()
            .filter(bank_statement_items::Column::CompanyId.eq(company_id.into_inner()))
            .filter(bank_statement_items::Column::StatementId.eq(statement_id.into_inner()))
            .order_by_asc(bank_statement_items::Column::Date)
            .order_by_asc(bank_statement_items::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db)?
            .into_iter()
            .map(StatementItem::try_from)
            .collect()
    }

    async fn statement_item(
        &mut self,
        company_id: CompanyId,
        id: StatementItemId,
    ) -> TreasuryResult<Option<StatementItem>> {
        bank_statement_items::Entity::find_by_id(id.into_inner())
            .filter(bank_statement_items::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.txn)
            .await
            .map_err(db)?
            .map(StatementItem::try_from)
            .transpose()
    }

    async fn update_statement_item(&mut self, item: &StatementItem) -> TreasuryResult<()> {
        // Identity, date and amounts are never rewritten
        bank_statement_items::Entity::update_many()
            .col_expr(
                bank_statement_items::Column::Status,
                Expr::value(item.status.as_str()),
            )
            .col_expr(
                bank_statement_items::Column::MatchType,
                Expr::value(item.match_type.map(|t| t.as_str().to_string())),
            )
            .col_expr(
                bank_statement_items::Column::Confidence,
                Expr::value(item.confidence),
            )
            .col_expr(
                bank_statement_items::Column::MovementId,
                Expr::value(item.movement_id.map(MovementId::into_inner)),
            )
            .col_expr(
                bank_statement_items::Column::SuspenseNote,
                Expr::value(item.suspense_note.clone()),
            )
            .col_expr(
                bank_statement_items::Column::ReconciledAt,
                Expr::value(item.reconciled_at),
            )
            .col_expr(
                bank_statement_items::Column::ReconciledBy,
                Expr::value(item.reconciled_by.map(ActorId::into_inner)),
            )
            .filter(bank_statement_items::Column::Id.eq(item.id.into_inner()))
            .filter(bank_statement_items::Column::CompanyId.eq(item.company_id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(unique_or_db("idx_statement_items_movement", || {
                item.movement_id.map_or(
                    TreasuryError::ConcurrentModification,
                    TreasuryError::MovementAlreadyReconciled,
                )
            }))?;
        Ok(())
    }

    // ========== Lifecycle ==========

    async fn commit(self) -> TreasuryResult<()> {
        self.txn.commit().await.map_err(db)
    }
}
