//! Storage seam.
//!
//! The engine never talks to a database directly. Every operation opens one
//! unit of work with [`TreasuryStore::begin`], performs reads, compare-and-set
//! transitions and relative balance deltas through [`TreasuryTx`], and calls
//! [`TreasuryTx::commit`]. Dropping a unit of work without committing rolls
//! it back.
//!
//! The db crate implements these traits on Postgres; [`MemoryStore`] is an
//! in-process implementation used by tests.

mod memory;

use std::future::Future;

use rust_decimal::Decimal;
use treasury_shared::types::{
    ActorId, BankAccountId, CashAccountId, CashClosingId, CheckId, CompanyId, MovementId,
    StatementId, StatementItemId,
};

use crate::composer::types::CashClosing;
use crate::error::TreasuryResult;
use crate::ledger::types::{DocumentRef, Movement};
use crate::reconciliation::types::{BankStatement, StatementItem};
use crate::registry::types::{BalanceTarget, BankAccount, CashAccount, Check, CheckState};

pub use memory::{MemoryStore, MemoryTx};

/// Source of units of work.
pub trait TreasuryStore: Send + Sync {
    /// The unit-of-work type.
    type Tx: TreasuryTx;

    /// Opens a unit of work.
    fn begin(&self) -> impl Future<Output = TreasuryResult<Self::Tx>> + Send;
}

/// One atomic unit of work.
///
/// Methods returning `bool` are compare-and-set updates: `false` means no
/// row matched the expected state.
pub trait TreasuryTx: Send {
    // ========== Accounts ==========

    /// Persists a new cash drawer.
    fn insert_cash_account(
        &mut self,
        account: &CashAccount,
    ) -> impl Future<Output = TreasuryResult<()>> + Send;

    /// Persists a new bank account.
    fn insert_bank_account(
        &mut self,
        account: &BankAccount,
    ) -> impl Future<Output = TreasuryResult<()>> + Send;

    /// Finds a cash drawer.
    fn cash_account(
        &mut self,
        company_id: CompanyId,
        id: CashAccountId,
    ) -> impl Future<Output = TreasuryResult<Option<CashAccount>>> + Send;

    /// Finds a bank account.
    fn bank_account(
        &mut self,
        company_id: CompanyId,
        id: BankAccountId,
    ) -> impl Future<Output = TreasuryResult<Option<BankAccount>>> + Send;

    /// Lists a company's cash drawers ordered by creation.
    fn cash_accounts(
        &mut self,
        company_id: CompanyId,
    ) -> impl Future<Output = TreasuryResult<Vec<CashAccount>>> + Send;

    /// Lists a company's bank accounts ordered by creation.
    fn bank_accounts(
        &mut self,
        company_id: CompanyId,
    ) -> impl Future<Output = TreasuryResult<Vec<BankAccount>>> + Send;

    /// Adds `delta` to a balance in place (`balance = balance + delta`).
    ///
    /// Returns `false` if the account does not exist.
    fn apply_balance_delta(
        &mut self,
        company_id: CompanyId,
        target: BalanceTarget,
        delta: Decimal,
    ) -> impl Future<Output = TreasuryResult<bool>> + Send;

    // ========== Checks ==========

    /// Persists a new check.
    fn insert_check(&mut self, check: &Check) -> impl Future<Output = TreasuryResult<()>> + Send;

    /// Finds a check.
    fn check(
        &mut self,
        company_id: CompanyId,
        id: CheckId,
    ) -> impl Future<Output = TreasuryResult<Option<Check>>> + Send;

    /// Lists a company's checks.
    fn checks(
        &mut self,
        company_id: CompanyId,
    ) -> impl Future<Output = TreasuryResult<Vec<Check>>> + Send;

    /// Moves a check from `from` to `to`, setting `deposited_into`.
    fn transition_check(
        &mut self,
        company_id: CompanyId,
        id: CheckId,
        from: CheckState,
        to: CheckState,
        deposited_into: Option<BankAccountId>,
    ) -> impl Future<Output = TreasuryResult<bool>> + Send;

    // ========== Movements ==========

    /// Persists a new movement. Never touches balances.
    fn insert_movement(
        &mut self,
        movement: &Movement,
    ) -> impl Future<Output = TreasuryResult<()>> + Send;

    /// Finds a movement.
    fn movement(
        &mut self,
        company_id: CompanyId,
        id: MovementId,
    ) -> impl Future<Output = TreasuryResult<Option<Movement>>> + Send;

    /// Lists the movements of a document ordered by creation.
    fn movements_for_document(
        &mut self,
        company_id: CompanyId,
        document: &DocumentRef,
    ) -> impl Future<Output = TreasuryResult<Vec<Movement>>> + Send;

    /// Lists every movement of a company.
    fn movements_for_company(
        &mut self,
        company_id: CompanyId,
    ) -> impl Future<Output = TreasuryResult<Vec<Movement>>> + Send;

    /// CONFIRMED, unreconciled movements targeting a bank account.
    fn unmatched_bank_movements(
        &mut self,
        company_id: CompanyId,
        bank_account_id: BankAccountId,
    ) -> impl Future<Output = TreasuryResult<Vec<Movement>>> + Send;

    /// PENDING → CONFIRMED.
    fn confirm_movement(
        &mut self,
        company_id: CompanyId,
        id: MovementId,
    ) -> impl Future<Output = TreasuryResult<bool>> + Send;

    /// CONFIRMED → REVERSED, recording `reversed_by`.
    fn mark_movement_reversed(
        &mut self,
        company_id: CompanyId,
        id: MovementId,
        reversed_by: MovementId,
    ) -> impl Future<Output = TreasuryResult<bool>> + Send;

    /// Swaps the reconciliation marker if it currently equals `expected`.
    fn set_reconciliation_marker(
        &mut self,
        company_id: CompanyId,
        id: MovementId,
        expected: Option<StatementItemId>,
        new: Option<StatementItemId>,
    ) -> impl Future<Output = TreasuryResult<bool>> + Send;

    // ========== Cash closings ==========

    /// Persists a new closing.
    fn insert_closing(
        &mut self,
        closing: &CashClosing,
    ) -> impl Future<Output = TreasuryResult<()>> + Send;

    /// Finds a closing.
    fn closing(
        &mut self,
        company_id: CompanyId,
        id: CashClosingId,
    ) -> impl Future<Output = TreasuryResult<Option<CashClosing>>> + Send;

    /// The PENDING closing of a drawer, if any.
    fn pending_closing(
        &mut self,
        company_id: CompanyId,
        cash_account_id: CashAccountId,
    ) -> impl Future<Output = TreasuryResult<Option<CashClosing>>> + Send;

    /// PENDING → APPROVED with note, adjustment link and approver.
    fn approve_closing(
        &mut self,
        company_id: CompanyId,
        id: CashClosingId,
        note: &str,
        adjustment_movement_id: Option<MovementId>,
        approved_by: ActorId,
    ) -> impl Future<Output = TreasuryResult<bool>> + Send;

    // ========== Bank statements ==========

    /// Persists a statement header.
    fn insert_statement(
        &mut self,
        statement: &BankStatement,
    ) -> impl Future<Output = TreasuryResult<()>> + Send;

    /// Persists a statement line.
    fn insert_statement_item(
        &mut self,
        item: &StatementItem,
    ) -> impl Future<Output = TreasuryResult<()>> + Send;

    /// Finds a statement header without locking it.
    fn statement(
        &mut self,
        company_id: CompanyId,
        id: StatementId,
    ) -> impl Future<Output = TreasuryResult<Option<BankStatement>>> + Send;

    /// Loads a statement header holding its row lock until commit.
    fn lock_statement(
        &mut self,
        company_id: CompanyId,
        id: StatementId,
    ) -> impl Future<Output = TreasuryResult<Option<BankStatement>>> + Send;

    /// Lists a statement's lines ordered by date.
    fn statement_items(
        &mut self,
        company_id: CompanyId,
        statement_id: StatementId,
    ) -> impl Future<Output = TreasuryResult<Vec<StatementItem>>> + Send;

    /// Finds a statement line.
    fn statement_item(
        &mut self,
        company_id: CompanyId,
        id: StatementItemId,
    ) -> impl Future<Output = TreasuryResult<Option<StatementItem>>> + Send;

    /// Overwrites a line's status and match fields.
    fn update_statement_item(
        &mut self,
        item: &StatementItem,
    ) -> impl Future<Output = TreasuryResult<()>> + Send;

    // ========== Lifecycle ==========

    /// Makes every change of this unit of work durable.
    fn commit(self) -> impl Future<Output = TreasuryResult<()>> + Send;
}
