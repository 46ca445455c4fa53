//! Composer service: multi-leg operations in one unit of work.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use treasury_shared::types::{CashClosingId, CheckId};

use super::types::{
    CashClosing, CashClosingInput, CashDepositInput, CashDepositResult, ClientPaymentInput,
    ClientPaymentResult, ClosingApproval, ClosingState, DepositPlan, PaymentLegTotals,
};
use crate::context::OperationContext;
use crate::error::{TreasuryError, TreasuryResult};
use crate::ledger::posting;
use crate::ledger::types::{
    AccountRef, Direction, DocumentRef, MovementState, PaymentMedium, RecordMovementInput,
};
use crate::registry::service::move_check;
use crate::registry::types::{Check, CheckState};
use crate::store::{TreasuryStore, TreasuryTx};

/// Document type stamped on closing adjustments.
pub const CASH_CLOSING_DOCUMENT: &str = "CASH_CLOSING";

/// Checks a leg amount: zero skips the leg, negative rejects it.
fn leg_amount(leg: &str, amount: Decimal) -> TreasuryResult<bool> {
    if amount < Decimal::ZERO {
        return Err(TreasuryError::NonPositiveAmount(amount).for_leg(leg));
    }
    Ok(!amount.is_zero())
}

/// Builds composed operations out of ledger movements.
///
/// Every recipe runs in a single unit of work; the first failing leg rolls
/// back all legs before it.
pub struct ComposerService<S: TreasuryStore> {
    store: Arc<S>,
}

impl<S: TreasuryStore> ComposerService<S> {
    /// Creates a new composer service.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Records a client payment split across cash, transfer and checks.
    ///
    /// Cash and check legs are CONFIRMED; the transfer leg is PENDING until
    /// the bank confirms it. Each check is taken into custody by the custody
    /// drawer and its amount lands on that drawer's portfolio.
    ///
    /// # Errors
    ///
    /// Returns `LegRejected` for a negative leg or a leg without account,
    /// `EmptyOperation` if every leg is zero, `TotalMismatch` if the legs do
    /// not add up to the declared total, and any ledger error per leg.
    pub async fn create_client_payment_movements(
        &self,
        ctx: &OperationContext,
        input: ClientPaymentInput,
    ) -> TreasuryResult<ClientPaymentResult> {
        // Validation before any write
        let has_cash = leg_amount("cash", input.cash_amount)?;
        if has_cash && input.cash_account_id.is_none() {
            return Err(TreasuryError::MissingLegAccount("cash".to_string()).for_leg("cash"));
        }
        let has_transfer = leg_amount("transfer", input.transfer_amount)?;
        if has_transfer && input.bank_account_id.is_none() {
            return Err(
                TreasuryError::MissingLegAccount("transfer".to_string()).for_leg("transfer")
            );
        }
        let mut check_legs = Vec::new();
        for (index, leg) in input.checks.iter().enumerate() {
            let name = format!("check[{index}]");
            if !leg_amount(&name, leg.amount)? {
                continue;
            }
            let Some(custody) = input.check_custody_account_id else {
                return Err(TreasuryError::MissingLegAccount(name.clone()).for_leg(name));
            };
            check_legs.push((name, custody, leg));
        }

        let legs = PaymentLegTotals {
            cash: input.cash_amount,
            transfer: input.transfer_amount,
            checks: check_legs.iter().map(|(_, _, leg)| leg.amount).sum(),
        };
        if legs.total().is_zero() {
            return Err(TreasuryError::EmptyOperation);
        }
        if legs.total() != input.total {
            return Err(TreasuryError::TotalMismatch {
                declared: input.total,
                computed: legs.total(),
            });
        }

        let mut tx = self.store.begin().await?;
        let mut movements = Vec::new();
        let mut check_ids = Vec::new();
        let document = Some(input.document.clone());

        if let (true, Some(cash_id)) = (has_cash, input.cash_account_id) {
            let leg = RecordMovementInput::new(
                AccountRef::Cash(cash_id),
                Direction::Inflow,
                PaymentMedium::Cash,
                input.cash_amount,
                &input.currency,
                input.date,
            )
            .with_description(&input.description)
            .with_document(document.clone());
            movements.push(
                posting::record(&mut tx, ctx, leg)
                    .await
                    .map_err(|e| e.for_leg("cash"))?,
            );
        }

        if let (true, Some(bank_id)) = (has_transfer, input.bank_account_id) {
            let leg = RecordMovementInput::new(
                AccountRef::Bank(bank_id),
                Direction::Inflow,
                PaymentMedium::Transfer,
                input.transfer_amount,
                &input.currency,
                input.date,
            )
            .with_description(&input.description)
            .with_document(document.clone())
            .with_state(MovementState::Pending);
            movements.push(
                posting::record(&mut tx, ctx, leg)
                    .await
                    .map_err(|e| e.for_leg("transfer"))?,
            );
        }

        for (name, custody, leg) in check_legs {
            let drawer = tx
                .cash_account(ctx.company_id, custody)
                .await?
                .ok_or_else(|| {
                    TreasuryError::AccountNotFound(AccountRef::Cash(custody)).for_leg(&name)
                })?;
            if !drawer.currency.eq_ignore_ascii_case(&input.currency) {
                return Err(TreasuryError::CurrencyMismatch {
                    expected: drawer.currency,
                    actual: input.currency.clone(),
                }
                .for_leg(name));
            }

            let check = Check {
                id: CheckId::new(),
                company_id: ctx.company_id,
                number: leg.number.clone(),
                bank_name: leg.bank_name.clone(),
                issuer: leg.issuer.clone(),
                amount: leg.amount,
                currency: drawer.currency.clone(),
                due_date: leg.due_date,
                state: CheckState::Custody,
                custody_account_id: custody,
                deposited_into: None,
                created_at: Utc::now(),
            };
            tx.insert_check(&check).await?;

            let movement = RecordMovementInput::new(
                AccountRef::Check(check.id),
                Direction::Inflow,
                PaymentMedium::ThirdPartyCheck,
                leg.amount,
                &input.currency,
                input.date,
            )
            .with_description(&input.description)
            .with_document(document.clone());
            movements.push(
                posting::record(&mut tx, ctx, movement)
                    .await
                    .map_err(|e| e.for_leg(&name))?,
            );
            check_ids.push(check.id);
        }

        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            document = %input.document,
            total = %legs.total(),
            movements = movements.len(),
            "Client payment recorded"
        );
        Ok(ClientPaymentResult {
            movements,
            check_ids,
            legs,
            total: legs.total(),
        })
    }

    /// Deposits drawer cash and checks into one bank account.
    ///
    /// Records one OUTFLOW for the cash, one OUTFLOW per check (from the
    /// portfolio) and a single INFLOW of the plan total into the bank. Every
    /// check moves CUSTODY → DEPOSITED.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, `CurrencyMismatch` between drawer and bank,
    /// `CheckNotFound`, `CheckStateConflict` for checks not in custody,
    /// `CheckNotInDrawer` for checks held by another drawer, or
    /// `EmptyOperation` if nothing is deposited.
    pub async fn create_cash_deposit(
        &self,
        ctx: &OperationContext,
        input: CashDepositInput,
    ) -> TreasuryResult<CashDepositResult> {
        leg_amount("cash", input.cash_amount)?;

        let mut tx = self.store.begin().await?;
        let drawer = tx
            .cash_account(ctx.company_id, input.cash_account_id)
            .await?
            .ok_or(TreasuryError::AccountNotFound(AccountRef::Cash(input.cash_account_id)))?;
        let bank = tx
            .bank_account(ctx.company_id, input.bank_account_id)
            .await?
            .ok_or(TreasuryError::AccountNotFound(AccountRef::Bank(input.bank_account_id)))?;
        if drawer.currency != bank.currency {
            return Err(TreasuryError::CurrencyMismatch {
                expected: bank.currency,
                actual: drawer.currency,
            });
        }

        let mut plan = DepositPlan {
            cash: input.cash_amount,
            checks: Vec::with_capacity(input.check_ids.len()),
        };
        for check_id in &input.check_ids {
            let check = tx
                .check(ctx.company_id, *check_id)
                .await?
                .ok_or(TreasuryError::CheckNotFound(*check_id))?;
            if check.state != CheckState::Custody {
                return Err(TreasuryError::CheckStateConflict {
                    check_id: check.id,
                    expected: CheckState::Custody,
                    actual: check.state,
                });
            }
            if check.custody_account_id != drawer.id {
                return Err(TreasuryError::CheckNotInDrawer {
                    check_id: check.id,
                    holder: check.custody_account_id,
                });
            }
            plan.checks.push((check.id, check.amount));
        }
        if plan.is_empty() {
            return Err(TreasuryError::EmptyOperation);
        }

        let document = Some(input.document.clone());
        let leg = |target: AccountRef, direction: Direction, amount: Decimal| {
            RecordMovementInput::new(
                target,
                direction,
                PaymentMedium::Deposit,
                amount,
                &drawer.currency,
                input.date,
            )
            .with_description(&input.description)
            .with_document(document.clone())
        };

        let mut outflows = Vec::with_capacity(plan.checks.len() + 1);
        if !plan.cash.is_zero() {
            let cash_leg = leg(AccountRef::Cash(drawer.id), Direction::Outflow, plan.cash);
            outflows.push(posting::record(&mut tx, ctx, cash_leg).await?);
        }
        for (check_id, amount) in &plan.checks {
            let check_leg = leg(AccountRef::Check(*check_id), Direction::Outflow, *amount);
            outflows.push(posting::record(&mut tx, ctx, check_leg).await?);
            // CAS guards against the same check listed twice
            move_check(
                &mut tx,
                ctx.company_id,
                *check_id,
                CheckState::Custody,
                CheckState::Deposited,
                Some(bank.id),
            )
            .await?;
        }
        let total = plan.total();
        let inflow = posting::record(
            &mut tx,
            ctx,
            leg(AccountRef::Bank(bank.id), Direction::Inflow, total),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            document = %input.document,
            bank_account_id = %bank.id,
            total = %total,
            checks = plan.checks.len(),
            "Cash deposit recorded"
        );
        Ok(CashDepositResult {
            outflows,
            inflow,
            total,
        })
    }

    /// Snapshots a drawer against a physical count.
    ///
    /// Zero variance is approved on the spot; anything else waits for
    /// [`Self::approve_cash_closing_with_adjustment`].
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveAmount` for a negative count, `AccountNotFound`,
    /// or `ClosingPendingApproval` if the drawer already has an open closing.
    /// A closing that races another one for the same drawer may instead
    /// fail with the retryable `ConcurrentModification`.
    pub async fn create_cash_closing(
        &self,
        ctx: &OperationContext,
        input: CashClosingInput,
    ) -> TreasuryResult<CashClosing> {
        if input.counted < Decimal::ZERO {
            return Err(TreasuryError::NonPositiveAmount(input.counted));
        }

        let mut tx = self.store.begin().await?;
        let drawer = tx
            .cash_account(ctx.company_id, input.cash_account_id)
            .await?
            .ok_or(TreasuryError::AccountNotFound(AccountRef::Cash(input.cash_account_id)))?;
        if let Some(open) = tx.pending_closing(ctx.company_id, drawer.id).await? {
            tracing::warn!(
                company_id = %ctx.company_id,
                cash_account_id = %drawer.id,
                closing_id = %open.id,
                "Closing rejected, previous closing pending approval"
            );
            return Err(TreasuryError::ClosingPendingApproval(open.id));
        }

        let system_balance = drawer.total();
        let variance = input.counted - system_balance;
        let balanced = variance.is_zero();
        let now = Utc::now();
        let closing = CashClosing {
            id: CashClosingId::new(),
            company_id: ctx.company_id,
            cash_account_id: drawer.id,
            date: input.date,
            cash_balance: drawer.balance,
            portfolio_balance: drawer.portfolio_balance,
            system_balance,
            counted: input.counted,
            variance,
            state: if balanced {
                ClosingState::Approved
            } else {
                ClosingState::Pending
            },
            note: None,
            adjustment_movement_id: None,
            created_by: ctx.actor_id,
            created_at: now,
            approved_by: balanced.then_some(ctx.actor_id),
            approved_at: balanced.then_some(now),
        };
        tx.insert_closing(&closing).await?;
        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            closing_id = %closing.id,
            system_balance = %system_balance,
            counted = %closing.counted,
            variance = %variance,
            state = %closing.state,
            "Cash closing created"
        );
        Ok(closing)
    }

    /// Approves a pending closing, booking its variance as an ADJUSTMENT.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalNoteRequired`, `ClosingNotFound`, or
    /// `ClosingAlreadyApproved` if the closing is not PENDING (including when
    /// a concurrent approval wins).
    pub async fn approve_cash_closing_with_adjustment(
        &self,
        ctx: &OperationContext,
        closing_id: CashClosingId,
        note: &str,
    ) -> TreasuryResult<ClosingApproval> {
        let note = note.trim();
        if note.is_empty() {
            return Err(TreasuryError::ApprovalNoteRequired);
        }

        let mut tx = self.store.begin().await?;
        let closing = tx
            .closing(ctx.company_id, closing_id)
            .await?
            .ok_or(TreasuryError::ClosingNotFound(closing_id))?;
        if closing.state != ClosingState::Pending {
            return Err(TreasuryError::ClosingAlreadyApproved(closing_id));
        }

        let adjustment = if closing.variance.is_zero() {
            None
        } else {
            let direction = if closing.variance > Decimal::ZERO {
                Direction::Inflow
            } else {
                Direction::Outflow
            };
            let drawer = tx
                .cash_account(ctx.company_id, closing.cash_account_id)
                .await?
                .ok_or(TreasuryError::AccountNotFound(AccountRef::Cash(
                    closing.cash_account_id,
                )))?;
            let input = RecordMovementInput::new(
                AccountRef::Cash(closing.cash_account_id),
                direction,
                PaymentMedium::Adjustment,
                closing.variance.abs(),
                drawer.currency,
                closing.date,
            )
            .with_description(note)
            .with_document(Some(DocumentRef::new(
                CASH_CLOSING_DOCUMENT,
                closing_id.to_string(),
            )));
            Some(posting::record(&mut tx, ctx, input).await?)
        };

        if !tx
            .approve_closing(
                ctx.company_id,
                closing_id,
                note,
                adjustment.as_ref().map(|m| m.id),
                ctx.actor_id,
            )
            .await?
        {
            return Err(TreasuryError::ClosingAlreadyApproved(closing_id));
        }
        let approved = tx
            .closing(ctx.company_id, closing_id)
            .await?
            .ok_or(TreasuryError::ClosingNotFound(closing_id))?;
        tx.commit().await?;

        tracing::info!(
            company_id = %ctx.company_id,
            closing_id = %closing_id,
            variance = %approved.variance,
            "Cash closing approved"
        );
        Ok(ClosingApproval {
            closing: approved,
            adjustment,
        })
    }

    /// Gets a closing.
    ///
    /// # Errors
    ///
    /// Returns `ClosingNotFound` if it does not exist.
    pub async fn closing(
        &self,
        ctx: &OperationContext,
        closing_id: CashClosingId,
    ) -> TreasuryResult<CashClosing> {
        let mut tx = self.store.begin().await?;
        tx.closing(ctx.company_id, closing_id)
            .await?
            .ok_or(TreasuryError::ClosingNotFound(closing_id))
    }
}
