//! Composed operation inputs and results.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use treasury_shared::types::{
    ActorId, BankAccountId, CashAccountId, CashClosingId, CheckId, CompanyId, MovementId,
};

use crate::ledger::types::{DocumentRef, Movement};

/// One check handed over as part of a client payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckLegInput {
    /// Check number.
    pub number: String,
    /// Issuing bank.
    pub bank_name: String,
    /// Who signed the check.
    pub issuer: String,
    /// Face value.
    pub amount: Decimal,
    /// Date the check can be cashed.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// A client payment split across cash, transfer and checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientPaymentInput {
    /// Payment document.
    pub document: DocumentRef,
    /// Payment date.
    pub date: NaiveDate,
    /// ISO currency code for every leg.
    pub currency: String,
    /// Declared total; the legs must add up to it.
    pub total: Decimal,
    /// Cash received.
    #[serde(default)]
    pub cash_amount: Decimal,
    /// Drawer receiving the cash.
    #[serde(default)]
    pub cash_account_id: Option<CashAccountId>,
    /// Transfer announced by the client.
    #[serde(default)]
    pub transfer_amount: Decimal,
    /// Bank account receiving the transfer.
    #[serde(default)]
    pub bank_account_id: Option<BankAccountId>,
    /// Checks received.
    #[serde(default)]
    pub checks: Vec<CheckLegInput>,
    /// Drawer taking custody of the checks.
    #[serde(default)]
    pub check_custody_account_id: Option<CashAccountId>,
    /// Free text copied to every movement.
    #[serde(default)]
    pub description: String,
}

/// Subtotals of a recorded client payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PaymentLegTotals {
    /// Cash leg.
    pub cash: Decimal,
    /// Transfer leg.
    pub transfer: Decimal,
    /// Sum of the check legs.
    pub checks: Decimal,
}

impl PaymentLegTotals {
    /// Sum of every leg.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.cash + self.transfer + self.checks
    }
}

/// Result of recording a client payment.
#[derive(Debug, Clone, Serialize)]
pub struct ClientPaymentResult {
    /// Movements created, in leg order (cash, transfer, checks).
    pub movements: Vec<Movement>,
    /// Checks taken into custody.
    pub check_ids: Vec<CheckId>,
    /// Leg subtotals.
    pub legs: PaymentLegTotals,
    /// Total recorded.
    pub total: Decimal,
}

/// A deposit of drawer cash and checks into one bank account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashDepositInput {
    /// Deposit slip document.
    pub document: DocumentRef,
    /// Deposit date.
    pub date: NaiveDate,
    /// Drawer handing over the money.
    pub cash_account_id: CashAccountId,
    /// Bank account receiving the deposit.
    pub bank_account_id: BankAccountId,
    /// Cash handed over.
    #[serde(default)]
    pub cash_amount: Decimal,
    /// Checks handed over.
    #[serde(default)]
    pub check_ids: Vec<CheckId>,
    /// Free text copied to every movement.
    #[serde(default)]
    pub description: String,
}

/// Resolved parts of a deposit.
///
/// The bank inflow is derived from `total()`, so it always equals the sum of
/// the drawer outflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositPlan {
    /// Cash leaving the drawer.
    pub cash: Decimal,
    /// Checks leaving the portfolio, with their face value.
    pub checks: Vec<(CheckId, Decimal)>,
}

impl DepositPlan {
    /// Sum of the cash and every check.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.cash + self.checks.iter().map(|(_, amount)| *amount).sum::<Decimal>()
    }

    /// Returns true if nothing is deposited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cash.is_zero() && self.checks.is_empty()
    }
}

/// Result of a cash deposit.
#[derive(Debug, Clone, Serialize)]
pub struct CashDepositResult {
    /// Drawer outflows: cash first, then one per check.
    pub outflows: Vec<Movement>,
    /// The single bank inflow.
    pub inflow: Movement,
    /// Amount deposited.
    pub total: Decimal,
}

string_enum! {
    /// Cash closing approval state.
    pub enum ClosingState {
        /// Variance waiting for approval.
        Pending => "PENDING",
        /// Closed.
        Approved => "APPROVED",
    }
}

/// Input for closing a cash drawer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashClosingInput {
    /// Drawer being counted.
    pub cash_account_id: CashAccountId,
    /// Closing date.
    pub date: NaiveDate,
    /// Amount physically counted (cash plus checks).
    pub counted: Decimal,
}

/// A cash drawer closing (arqueo).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashClosing {
    /// Closing ID.
    pub id: CashClosingId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Drawer counted.
    pub cash_account_id: CashAccountId,
    /// Closing date.
    pub date: NaiveDate,
    /// Drawer cash at closing time.
    pub cash_balance: Decimal,
    /// Drawer portfolio at closing time.
    pub portfolio_balance: Decimal,
    /// Cash plus portfolio.
    pub system_balance: Decimal,
    /// Amount physically counted.
    pub counted: Decimal,
    /// `counted - system_balance`.
    pub variance: Decimal,
    /// Approval state.
    pub state: ClosingState,
    /// Approval note.
    pub note: Option<String>,
    /// ADJUSTMENT movement booked on approval.
    pub adjustment_movement_id: Option<MovementId>,
    /// Who counted.
    pub created_by: ActorId,
    /// When counted.
    pub created_at: DateTime<Utc>,
    /// Who approved.
    pub approved_by: Option<ActorId>,
    /// When approved.
    pub approved_at: Option<DateTime<Utc>>,
}

/// Result of approving a closing.
#[derive(Debug, Clone, Serialize)]
pub struct ClosingApproval {
    /// The approved closing.
    pub closing: CashClosing,
    /// The ADJUSTMENT movement, absent for a zero variance.
    pub adjustment: Option<Movement>,
}
