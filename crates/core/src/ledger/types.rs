//! Ledger domain types.
//!
//! A movement is the unit of financial fact: one signed change to one
//! account. Everything else in the engine (composed operations, reversals,
//! reconciliation) is expressed as movements plus state transitions.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use treasury_shared::types::{
    ActorId, BankAccountId, CashAccountId, CheckId, CompanyId, MovementId, StatementItemId,
};

use crate::error::{TreasuryError, TreasuryResult};

string_enum! {
    /// Direction of money relative to the target account.
    pub enum Direction {
        /// Money enters the account.
        Inflow => "INFLOW",
        /// Money leaves the account.
        Outflow => "OUTFLOW",
    }
}

impl Direction {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Inflow => Self::Outflow,
            Self::Outflow => Self::Inflow,
        }
    }

    /// Applies this direction's sign to a positive amount.
    #[must_use]
    pub fn sign(self, amount: Decimal) -> Decimal {
        match self {
            Self::Inflow => amount,
            Self::Outflow => -amount,
        }
    }
}

string_enum! {
    /// How the money moved.
    pub enum PaymentMedium {
        /// Bills and coins.
        Cash => "CASH",
        /// Bank transfer.
        Transfer => "TRANSFER",
        /// Check issued by a third party.
        ThirdPartyCheck => "THIRD_PARTY_CHECK",
        /// Check issued by the company.
        OwnCheck => "OWN_CHECK",
        /// Card payment.
        Card => "CARD",
        /// Correction, e.g. a cash closing variance.
        Adjustment => "ADJUSTMENT",
        /// Cash or checks deposited into a bank account.
        Deposit => "DEPOSIT",
    }
}

string_enum! {
    /// Kind of account a movement targets.
    pub enum AccountKind {
        /// Cash drawer balance.
        Cash => "CASH",
        /// Bank account balance.
        Bank => "BANK",
        /// Checks held in custody by a cash drawer.
        CheckPortfolio => "CHECK_PORTFOLIO",
    }
}

string_enum! {
    /// Movement lifecycle state.
    pub enum MovementState {
        /// Recorded, no balance effect yet.
        Pending => "PENDING",
        /// Balance effect applied.
        Confirmed => "CONFIRMED",
        /// Offset by a reversal movement.
        Reversed => "REVERSED",
    }
}

impl Default for MovementState {
    fn default() -> Self {
        Self::Confirmed
    }
}

impl MovementState {
    /// Returns true if the movement's amount has been applied to a balance.
    ///
    /// A reversed movement still counts: its effect is cancelled by the
    /// reversal movement, not removed.
    #[must_use]
    pub const fn applies_balance(self) -> bool {
        matches!(self, Self::Confirmed | Self::Reversed)
    }
}

/// The single account a movement targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRef {
    /// A cash drawer.
    Cash(CashAccountId),
    /// A bank account.
    Bank(BankAccountId),
    /// A check; the balance effect lands on its holder's portfolio.
    Check(CheckId),
}

impl AccountRef {
    /// Builds a target from the three optional ids of an input.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTarget` unless exactly one id is given.
    pub fn from_parts(
        cash: Option<CashAccountId>,
        bank: Option<BankAccountId>,
        check: Option<CheckId>,
    ) -> TreasuryResult<Self> {
        match (cash, bank, check) {
            (Some(id), None, None) => Ok(Self::Cash(id)),
            (None, Some(id), None) => Ok(Self::Bank(id)),
            (None, None, Some(id)) => Ok(Self::Check(id)),
            _ => Err(TreasuryError::InvalidTarget {
                count: usize::from(cash.is_some())
                    + usize::from(bank.is_some())
                    + usize::from(check.is_some()),
            }),
        }
    }

    /// Returns the account kind tag.
    #[must_use]
    pub const fn kind(self) -> AccountKind {
        match self {
            Self::Cash(_) => AccountKind::Cash,
            Self::Bank(_) => AccountKind::Bank,
            Self::Check(_) => AccountKind::CheckPortfolio,
        }
    }

    /// Returns the cash account id, if this targets a cash drawer.
    #[must_use]
    pub const fn cash_account_id(self) -> Option<CashAccountId> {
        match self {
            Self::Cash(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the bank account id, if this targets a bank account.
    #[must_use]
    pub const fn bank_account_id(self) -> Option<BankAccountId> {
        match self {
            Self::Bank(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the check id, if this targets a check.
    #[must_use]
    pub const fn check_id(self) -> Option<CheckId> {
        match self {
            Self::Check(id) => Some(id),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cash(id) => write!(f, "cash account {id}"),
            Self::Bank(id) => write!(f, "bank account {id}"),
            Self::Check(id) => write!(f, "check {id}"),
        }
    }
}

/// Link from a movement to the business document that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Document type, e.g. `PAYMENT` or `CASH_DEPOSIT`.
    pub reference_type: String,
    /// Document identifier within its type.
    pub reference_id: String,
}

impl DocumentRef {
    /// Creates a document reference.
    #[must_use]
    pub fn new(reference_type: impl Into<String>, reference_id: impl Into<String>) -> Self {
        Self {
            reference_type: reference_type.into(),
            reference_id: reference_id.into(),
        }
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.reference_type, self.reference_id)
    }
}

/// A recorded treasury movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Movement ID.
    pub id: MovementId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Accounting date.
    pub date: NaiveDate,
    /// Date the funds become available (clearing delay), if different.
    pub value_date: Option<NaiveDate>,
    /// Direction relative to the target.
    pub direction: Direction,
    /// Payment medium.
    pub medium: PaymentMedium,
    /// Strictly positive amount; `direction` carries the sign.
    pub amount: Decimal,
    /// ISO currency code.
    pub currency: String,
    /// Target account.
    pub target: AccountRef,
    /// Free text.
    pub description: String,
    /// Originating document, if any.
    pub document: Option<DocumentRef>,
    /// Lifecycle state.
    pub state: MovementState,
    /// Movement this one reverses.
    pub reversal_of_id: Option<MovementId>,
    /// Movement that reversed this one.
    pub reversed_by_id: Option<MovementId>,
    /// Statement item this movement is reconciled to.
    pub reconciled_item_id: Option<StatementItemId>,
    /// Audit: creator.
    pub created_by: ActorId,
    /// Audit: creation time.
    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// Returns `+amount` for inflows and `-amount` for outflows.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.direction.sign(self.amount)
    }

    /// Returns true if this movement offsets another one.
    #[must_use]
    pub const fn is_reversal(&self) -> bool {
        self.reversal_of_id.is_some()
    }

    /// Date used for matching: value date when known, otherwise the date.
    #[must_use]
    pub fn effective_date(&self) -> NaiveDate {
        self.value_date.unwrap_or(self.date)
    }
}

/// Input for recording a single movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMovementInput {
    /// Direction relative to the target.
    pub direction: Direction,
    /// Payment medium.
    pub medium: PaymentMedium,
    /// Amount, must be positive.
    pub amount: Decimal,
    /// ISO currency code, must equal the target account's currency.
    pub currency: String,
    /// Cash drawer target.
    #[serde(default)]
    pub cash_account_id: Option<CashAccountId>,
    /// Bank account target.
    #[serde(default)]
    pub bank_account_id: Option<BankAccountId>,
    /// Check target.
    #[serde(default)]
    pub check_id: Option<CheckId>,
    /// Accounting date.
    pub date: NaiveDate,
    /// Clearing date.
    #[serde(default)]
    pub value_date: Option<NaiveDate>,
    /// Free text.
    #[serde(default)]
    pub description: String,
    /// Originating document.
    #[serde(default)]
    pub document: Option<DocumentRef>,
    /// Initial state; PENDING defers the balance effect.
    #[serde(default)]
    pub state: MovementState,
}

impl RecordMovementInput {
    /// Starts an input targeting `target`.
    #[must_use]
    pub fn new(
        target: AccountRef,
        direction: Direction,
        medium: PaymentMedium,
        amount: Decimal,
        currency: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            direction,
            medium,
            amount,
            currency: currency.into(),
            cash_account_id: target.cash_account_id(),
            bank_account_id: target.bank_account_id(),
            check_id: target.check_id(),
            date,
            value_date: None,
            description: String::new(),
            document: None,
            state: MovementState::Confirmed,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the document link.
    #[must_use]
    pub fn with_document(mut self, document: Option<DocumentRef>) -> Self {
        self.document = document;
        self
    }

    /// Sets the initial state.
    #[must_use]
    pub const fn with_state(mut self, state: MovementState) -> Self {
        self.state = state;
        self
    }

    /// Sets the value date.
    #[must_use]
    pub const fn with_value_date(mut self, value_date: Option<NaiveDate>) -> Self {
        self.value_date = value_date;
        self
    }
}
