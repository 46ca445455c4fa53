//! Registry service: accounts, checks, position and integrity.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use treasury_shared::types::{BankAccountId, CashAccountId, CheckId, CompanyId};

use super::types::{
    BankAccount, CashAccount, Check, CheckState, IntegrityReport, OpenBankAccountInput,
    OpenCashAccountInput, TreasuryPosition,
};
use crate::context::OperationContext;
use crate::error::{TreasuryError, TreasuryResult};
use crate::ledger::types::AccountRef;
use crate::store::{TreasuryStore, TreasuryTx};

/// Moves a check between custody states with a compare-and-set.
///
/// # Errors
///
/// Returns `CheckNotFound`, or `CheckStateConflict` naming the current state
/// if the check is not in `from`.
pub async fn move_check<T: TreasuryTx>(
    tx: &mut T,
    company_id: CompanyId,
    check_id: CheckId,
    from: CheckState,
    to: CheckState,
    deposited_into: Option<BankAccountId>,
) -> TreasuryResult<()> {
    if tx
        .transition_check(company_id, check_id, from, to, deposited_into)
        .await?
    {
        return Ok(());
    }
    let check = tx
        .check(company_id, check_id)
        .await?
        .ok_or(TreasuryError::CheckNotFound(check_id))?;
    Err(TreasuryError::CheckStateConflict {
        check_id,
        expected: from,
        actual: check.state,
    })
}

/// Manages cash drawers, bank accounts and checks.
pub struct RegistryService<S: TreasuryStore> {
    store: Arc<S>,
}

impl<S: TreasuryStore> RegistryService<S> {
    /// Creates a new registry service.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Opens a cash drawer with zero balances.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn open_cash_account(
        &self,
        ctx: &OperationContext,
        input: OpenCashAccountInput,
    ) -> TreasuryResult<CashAccount> {
        let account = CashAccount {
            id: CashAccountId::new(),
            company_id: ctx.company_id,
            name: input.name,
            currency: input.currency.trim().to_ascii_uppercase(),
            balance: Decimal::ZERO,
            portfolio_balance: Decimal::ZERO,
            created_at: Utc::now(),
        };

        let mut tx = self.store.begin().await?;
        tx.insert_cash_account(&account).await?;
        tx.commit().await?;

        tracing::info!(company_id = %ctx.company_id, account_id = %account.id, "Cash account opened");
        Ok(account)
    }

    /// Opens a bank account with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn open_bank_account(
        &self,
        ctx: &OperationContext,
        input: OpenBankAccountInput,
    ) -> TreasuryResult<BankAccount> {
        let account = BankAccount {
            id: BankAccountId::new(),
            company_id: ctx.company_id,
            name: input.name,
            bank_name: input.bank_name,
            account_number: input.account_number,
            currency: input.currency.trim().to_ascii_uppercase(),
            balance: Decimal::ZERO,
            created_at: Utc::now(),
        };

        let mut tx = self.store.begin().await?;
        tx.insert_bank_account(&account).await?;
        tx.commit().await?;

        tracing::info!(company_id = %ctx.company_id, account_id = %account.id, "Bank account opened");
        Ok(account)
    }

    /// Gets a cash drawer.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if it does not exist.
    pub async fn cash_account(
        &self,
        ctx: &OperationContext,
        id: CashAccountId,
    ) -> TreasuryResult<CashAccount> {
        let mut tx = self.store.begin().await?;
        tx.cash_account(ctx.company_id, id)
            .await?
            .ok_or(TreasuryError::AccountNotFound(AccountRef::Cash(id)))
    }

    /// Gets a bank account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if it does not exist.
    pub async fn bank_account(
        &self,
        ctx: &OperationContext,
        id: BankAccountId,
    ) -> TreasuryResult<BankAccount> {
        let mut tx = self.store.begin().await?;
        tx.bank_account(ctx.company_id, id)
            .await?
            .ok_or(TreasuryError::AccountNotFound(AccountRef::Bank(id)))
    }

    /// Gets a check.
    ///
    /// # Errors
    ///
    /// Returns `CheckNotFound` if it does not exist.
    pub async fn check(&self, ctx: &OperationContext, id: CheckId) -> TreasuryResult<Check> {
        let mut tx = self.store.begin().await?;
        tx.check(ctx.company_id, id)
            .await?
            .ok_or(TreasuryError::CheckNotFound(id))
    }

    /// Read-only aggregate of every account with per-currency totals.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn get_treasury_position(
        &self,
        ctx: &OperationContext,
    ) -> TreasuryResult<TreasuryPosition> {
        let mut tx = self.store.begin().await?;
        let cash = tx.cash_accounts(ctx.company_id).await?;
        let bank = tx.bank_accounts(ctx.company_id).await?;
        Ok(TreasuryPosition::from_accounts(ctx.company_id, &cash, &bank))
    }

    /// Recomputes every balance from its movements and reports drift.
    ///
    /// # Errors
    ///
    /// Returns storage errors. Drift is reported, not raised.
    pub async fn verify_integrity(&self, ctx: &OperationContext) -> TreasuryResult<IntegrityReport> {
        let mut tx = self.store.begin().await?;
        let cash = tx.cash_accounts(ctx.company_id).await?;
        let bank = tx.bank_accounts(ctx.company_id).await?;
        let checks = tx.checks(ctx.company_id).await?;
        let movements = tx.movements_for_company(ctx.company_id).await?;

        let report = IntegrityReport::compute(ctx.company_id, &cash, &bank, &checks, &movements);
        for drift in &report.drifts {
            tracing::warn!(
                company_id = %ctx.company_id,
                target = %drift.target,
                recorded = %drift.recorded,
                computed = %drift.computed,
                "Balance drift detected"
            );
        }
        tracing::debug!(
            company_id = %ctx.company_id,
            checked = report.checked,
            movements = movements.len(),
            "Integrity verified"
        );
        Ok(report)
    }

    /// Marks a deposited check as settled by the bank.
    ///
    /// The bank inflow was recorded at deposit time; only custody changes.
    ///
    /// # Errors
    ///
    /// Returns `CheckNotFound` or `CheckStateConflict` unless DEPOSITED.
    pub async fn clear_check(&self, ctx: &OperationContext, check_id: CheckId) -> TreasuryResult<Check> {
        self.settle(ctx, check_id, CheckState::Cleared).await
    }

    /// Marks a deposited check as bounced.
    ///
    /// Undo the deposit with the reversal manager to take it back into custody.
    ///
    /// # Errors
    ///
    /// Returns `CheckNotFound` or `CheckStateConflict` unless DEPOSITED.
    pub async fn reject_check(
        &self,
        ctx: &OperationContext,
        check_id: CheckId,
    ) -> TreasuryResult<Check> {
        self.settle(ctx, check_id, CheckState::Rejected).await
    }

    async fn settle(
        &self,
        ctx: &OperationContext,
        check_id: CheckId,
        to: CheckState,
    ) -> TreasuryResult<Check> {
        let mut tx = self.store.begin().await?;
        let check = tx
            .check(ctx.company_id, check_id)
            .await?
            .ok_or(TreasuryError::CheckNotFound(check_id))?;
        move_check(
            &mut tx,
            ctx.company_id,
            check_id,
            CheckState::Deposited,
            to,
            check.deposited_into,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(company_id = %ctx.company_id, check_id = %check_id, state = %to, "Check settled");
        Ok(Check { state: to, ..check })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::Direction;
    use crate::registry::types::BalanceTarget;
    use crate::testing::Fixture;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_open_accounts_start_empty() {
        let fx = Fixture::new().await;
        let account = fx
            .registry()
            .open_cash_account(
                &fx.ctx,
                OpenCashAccountInput {
                    name: "Branch".to_string(),
                    currency: " usd ".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(account.currency, "USD");
        assert_eq!(account.total(), Decimal::ZERO);
        assert_eq!(
            fx.registry().cash_account(&fx.ctx, account.id).await.unwrap(),
            account
        );
    }

    #[tokio::test]
    async fn test_position_reflects_movements() {
        let fx = Fixture::new().await;
        fx.record(AccountRef::Cash(fx.cash.id), Direction::Inflow, dec!(300)).await;
        fx.record(AccountRef::Bank(fx.bank.id), Direction::Inflow, dec!(2000)).await;

        let position = fx.registry().get_treasury_position(&fx.ctx).await.unwrap();

        assert_eq!(position.cash_accounts[0].cash_balance, dec!(300));
        assert_eq!(position.bank_accounts[0].balance, dec!(2000));
        assert_eq!(position.totals.len(), 1);
        assert_eq!(position.totals[0].grand_total, dec!(2300));
    }

    #[tokio::test]
    async fn test_verify_integrity_detects_tampering() {
        let fx = Fixture::new().await;
        fx.record(AccountRef::Cash(fx.cash.id), Direction::Inflow, dec!(300)).await;

        let report = fx.registry().verify_integrity(&fx.ctx).await.unwrap();
        assert!(report.is_consistent());

        fx.store
            .tamper_balance(BalanceTarget::CashDrawer(fx.cash.id), dec!(299))
            .await;
        let report = fx.registry().verify_integrity(&fx.ctx).await.unwrap();
        assert_eq!(report.drifts.len(), 1);
        assert_eq!(report.drifts[0].computed, dec!(300));
    }

    #[tokio::test]
    async fn test_settling_requires_deposited_check() {
        let fx = Fixture::new().await;
        let check_id = fx.receive_check(dec!(400)).await;

        let err = fx.registry().clear_check(&fx.ctx, check_id).await.unwrap_err();
        assert!(matches!(
            err,
            TreasuryError::CheckStateConflict {
                expected: CheckState::Deposited,
                actual: CheckState::Custody,
                ..
            }
        ));

        fx.deposit_checks(vec![check_id]).await;
        let cleared = fx.registry().clear_check(&fx.ctx, check_id).await.unwrap();
        assert_eq!(cleared.state, CheckState::Cleared);
        assert_eq!(cleared.deposited_into, Some(fx.bank.id));

        let again = fx.registry().reject_check(&fx.ctx, check_id).await;
        assert!(matches!(again, Err(TreasuryError::CheckStateConflict { .. })));
    }

    #[tokio::test]
    async fn test_settling_unknown_check() {
        let fx = Fixture::new().await;
        let result = fx.registry().reject_check(&fx.ctx, CheckId::new()).await;
        assert!(matches!(result, Err(TreasuryError::CheckNotFound(_))));
    }
}
