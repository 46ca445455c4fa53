//! In-memory store.
//!
//! Units of work are serialized behind one async mutex. Each unit of work
//! edits a private copy of the state, written back only on commit.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use treasury_shared::types::{
    ActorId, BankAccountId, CashAccountId, CashClosingId, CheckId, CompanyId, MovementId,
    StatementId, StatementItemId,
};

use super::{TreasuryStore, TreasuryTx};
use crate::composer::types::{CashClosing, ClosingState};
use crate::error::TreasuryResult;
use crate::ledger::types::{AccountRef, DocumentRef, Movement, MovementState};
use crate::reconciliation::types::{BankStatement, StatementItem};
use crate::registry::types::{BalanceTarget, BankAccount, CashAccount, Check, CheckState};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    cash_accounts: Vec<CashAccount>,
    bank_accounts: Vec<BankAccount>,
    checks: Vec<Check>,
    movements: Vec<Movement>,
    closings: Vec<CashClosing>,
    statements: Vec<BankStatement>,
    items: Vec<StatementItem>,
}

/// Process-local [`TreasuryStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a stored balance without a movement.
    #[cfg(test)]
    pub(crate) async fn tamper_balance(&self, target: BalanceTarget, balance: Decimal) {
        let mut state = self.state.lock().await;
        match target {
            BalanceTarget::CashDrawer(id) => {
                if let Some(a) = state.cash_accounts.iter_mut().find(|a| a.id == id) {
                    a.balance = balance;
                }
            }
            BalanceTarget::Portfolio(id) => {
                if let Some(a) = state.cash_accounts.iter_mut().find(|a| a.id == id) {
                    a.portfolio_balance = balance;
                }
            }
            BalanceTarget::Bank(id) => {
                if let Some(a) = state.bank_accounts.iter_mut().find(|a| a.id == id) {
                    a.balance = balance;
                }
            }
        }
    }
}

impl TreasuryStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> TreasuryResult<MemoryTx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = (*guard).clone();
        Ok(MemoryTx { guard, working })
    }
}

/// Unit of work over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTx {
    fn movement_mut(&mut self, company_id: CompanyId, id: MovementId) -> Option<&mut Movement> {
        self.working
            .movements
            .iter_mut()
            .find(|m| m.id == id && m.company_id == company_id)
    }
}

impl TreasuryTx for MemoryTx {
    async fn insert_cash_account(&mut self, account: &CashAccount) -> TreasuryResult<()> {
        self.working.cash_accounts.push(account.clone());
        Ok(())
    }

    async fn insert_bank_account(&mut self, account: &BankAccount) -> TreasuryResult<()> {
        self.working.bank_accounts.push(account.clone());
        Ok(())
    }

    async fn cash_account(
        &mut self,
        company_id: CompanyId,
        id: CashAccountId,
    ) -> TreasuryResult<Option<CashAccount>> {
        Ok(self
            .working
            .cash_accounts
            .iter()
            .find(|a| a.id == id && a.company_id == company_id)
            .cloned())
    }

    async fn bank_account(
        &mut self,
        company_id: CompanyId,
        id: BankAccountId,
    ) -> TreasuryResult<Option<BankAccount>> {
        Ok(self
            .working
            .bank_accounts
            .iter()
            .find(|a| a.id == id && a.company_id == company_id)
            .cloned())
    }

    async fn cash_accounts(&mut self, company_id: CompanyId) -> TreasuryResult<Vec<CashAccount>> {
        Ok(self
            .working
            .cash_accounts
            .iter()
            .filter(|a| a.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn bank_accounts(&mut self, company_id: CompanyId) -> TreasuryResult<Vec<BankAccount>> {
        Ok(self
            .working
            .bank_accounts
            .iter()
            .filter(|a| a.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn apply_balance_delta(
        &mut self,
        company_id: CompanyId,
        target: BalanceTarget,
        delta: Decimal,
    ) -> TreasuryResult<bool> {
        let state = &mut self.working;
        let slot = match target {
            BalanceTarget::CashDrawer(id) => state
                .cash_accounts
                .iter_mut()
                .find(|a| a.id == id && a.company_id == company_id)
                .map(|a| &mut a.balance),
            BalanceTarget::Portfolio(id) => state
                .cash_accounts
                .iter_mut()
                .find(|a| a.id == id && a.company_id == company_id)
                .map(|a| &mut a.portfolio_balance),
            BalanceTarget::Bank(id) => state
                .bank_accounts
                .iter_mut()
                .find(|a| a.id == id && a.company_id == company_id)
                .map(|a| &mut a.balance),
        };
        let Some(balance) = slot else {
            return Ok(false);
        };
        *balance += delta;
        Ok(true)
    }

    async fn insert_check(&mut self, check: &Check) -> TreasuryResult<()> {
        self.working.checks.push(check.clone());
        Ok(())
    }

    async fn check(&mut self, company_id: CompanyId, id: CheckId) -> TreasuryResult<Option<Check>> {
        Ok(self
            .working
            .checks
            .iter()
            .find(|c| c.id == id && c.company_id == company_id)
            .cloned())
    }

    async fn checks(&mut self, company_id: CompanyId) -> TreasuryResult<Vec<Check>> {
        Ok(self
            .working
            .checks
            .iter()
            .filter(|c| c.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn transition_check(
        &mut self,
        company_id: CompanyId,
        id: CheckId,
        from: CheckState,
        to: CheckState,
        deposited_into: Option<BankAccountId>,
    ) -> TreasuryResult<bool> {
        let Some(check) = self
            .working
            .checks
            .iter_mut()
            .find(|c| c.id == id && c.company_id == company_id && c.state == from)
        else {
            return Ok(false);
        };
        check.state = to;
        check.deposited_into = deposited_into;
        Ok(true)
    }

    async fn insert_movement(&mut self, movement: &Movement) -> TreasuryResult<()> {
        self.working.movements.push(movement.clone());
        Ok(())
    }

    async fn movement(
        &mut self,
        company_id: CompanyId,
        id: MovementId,
    ) -> TreasuryResult<Option<Movement>> {
        Ok(self.movement_mut(company_id, id).cloned())
    }

    async fn movements_for_document(
        &mut self,
        company_id: CompanyId,
        document: &DocumentRef,
    ) -> TreasuryResult<Vec<Movement>> {
        Ok(self
            .working
            .movements
            .iter()
            .filter(|m| m.company_id == company_id && m.document.as_ref() == Some(document))
            .cloned()
            .collect())
    }

    async fn movements_for_company(
        &mut self,
        company_id: CompanyId,
    ) -> TreasuryResult<Vec<Movement>> {
        Ok(self
            .working
            .movements
            .iter()
            .filter(|m| m.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn unmatched_bank_movements(
        &mut self,
        company_id: CompanyId,
        bank_account_id: BankAccountId,
    ) -> TreasuryResult<Vec<Movement>> {
        Ok(self
            .working
            .movements
            .iter()
            .filter(|m| {
                m.company_id == company_id
                    && m.target == AccountRef::Bank(bank_account_id)
                    && m.state == MovementState::Confirmed
                    && m.reconciled_item_id.is_none()
            })
            .cloned()
            .collect())
    }

    async fn confirm_movement(
        &mut self,
        company_id: CompanyId,
        id: MovementId,
    ) -> TreasuryResult<bool> {
        let Some(movement) = self
            .movement_mut(company_id, id)
            .filter(|m| m.state == MovementState::Pending)
        else {
            return Ok(false);
        };
        movement.state = MovementState::Confirmed;
        Ok(true)
    }

    async fn mark_movement_reversed(
        &mut self,
        company_id: CompanyId,
        id: MovementId,
        reversed_by: MovementId,
    ) -> TreasuryResult<bool> {
        let Some(movement) = self
            .movement_mut(company_id, id)
            .filter(|m| m.state == MovementState::Confirmed)
        else {
            return Ok(false);
        };
        movement.state = MovementState::Reversed;
        movement.reversed_by_id = Some(reversed_by);
        Ok(true)
    }

    async fn set_reconciliation_marker(
        &mut self,
        company_id: CompanyId,
        id: MovementId,
        expected: Option<StatementItemId>,
        new: Option<StatementItemId>,
    ) -> TreasuryResult<bool> {
        let Some(movement) = self
            .movement_mut(company_id, id)
            .filter(|m| m.reconciled_item_id == expected)
        else {
            return Ok(false);
        };
        movement.reconciled_item_id = new;
        Ok(true)
    }

    async fn insert_closing(&mut self, closing: &CashClosing) -> TreasuryResult<()> {
        self.working.closings.push(closing.clone());
        Ok(())
    }

    async fn closing(
        &mut self,
        company_id: CompanyId,
        id: CashClosingId,
    ) -> TreasuryResult<Option<CashClosing>> {
        Ok(self
            .working
            .closings
            .iter()
            .find(|c| c.id == id && c.company_id == company_id)
            .cloned())
    }

    async fn pending_closing(
        &mut self,
        company_id: CompanyId,
        cash_account_id: CashAccountId,
    ) -> TreasuryResult<Option<CashClosing>> {
        Ok(self
            .working
            .closings
            .iter()
            .find(|c| {
                c.company_id == company_id
                    && c.cash_account_id == cash_account_id
                    && c.state == ClosingState::Pending
            })
            .cloned())
    }

    async fn approve_closing(
        &mut self,
        company_id: CompanyId,
        id: CashClosingId,
        note: &str,
        adjustment_movement_id: Option<MovementId>,
        approved_by: ActorId,
    ) -> TreasuryResult<bool> {
        let Some(closing) = self.working.closings.iter_mut().find(|c| {
            c.id == id && c.company_id == company_id && c.state == ClosingState::Pending
        }) else {
            return Ok(false);
        };
        closing.state = ClosingState::Approved;
        closing.note = Some(note.to_string());
        closing.adjustment_movement_id = adjustment_movement_id;
        closing.approved_by = Some(approved_by);
        closing.approved_at = Some(Utc::now());
        Ok(true)
    }

    async fn insert_statement(&mut self, statement: &BankStatement) -> TreasuryResult<()> {
        self.working.statements.push(statement.clone());
        Ok(())
    }

    async fn insert_statement_item(&mut self, item: &StatementItem) -> TreasuryResult<()> {
        self.working.items.push(item.clone());
        Ok(())
    }

    async fn statement(
        &mut self,
        company_id: CompanyId,
        id: StatementId,
    ) -> TreasuryResult<Option<BankStatement>> {
        Ok(self
            .working
            .statements
            .iter()
            .find(|s| s.id == id && s.company_id == company_id)
            .cloned())
    }

    async fn lock_statement(
        &mut self,
        company_id: CompanyId,
        id: StatementId,
    ) -> TreasuryResult<Option<BankStatement>> {
        // The store mutex already serializes units of work
        self.statement(company_id, id).await
    }

    async fn statement_items(
        &mut self,
        company_id: CompanyId,
        statement_id: StatementId,
    ) -> TreasuryResult<Vec<StatementItem>> {
        let mut items: Vec<StatementItem> = self
            .working
            .items
            .iter()
            .filter(|i| i.company_id == company_id && i.statement_id == statement_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.date);
        Ok(items)
    }

    async fn statement_item(
        &mut self,
        company_id: CompanyId,
        id: StatementItemId,
    ) -> TreasuryResult<Option<StatementItem>> {
        Ok(self
            .working
            .items
            .iter()
            .find(|i| i.id == id && i.company_id == company_id)
            .cloned())
    }

    async fn update_statement_item(&mut self, item: &StatementItem) -> TreasuryResult<()> {
        if let Some(slot) = self
            .working
            .items
            .iter_mut()
            .find(|i| i.id == item.id && i.company_id == item.company_id)
        {
            *slot = item.clone();
        }
        Ok(())
    }

    async fn commit(mut self) -> TreasuryResult<()> {
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }
}
