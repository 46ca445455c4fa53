//! Treasury error types.
//!
//! Validation errors are raised before anything is written. Consistency
//! errors name the state conflict so callers can tell "nothing happened"
//! apart from "partially happened" (the latter never escapes a unit of work:
//! an error drops the storage transaction, which rolls it back).

use rust_decimal::Decimal;
use thiserror::Error;
use treasury_shared::types::{
    BankAccountId, CashAccountId, CashClosingId, CheckId, MovementId, StatementId,
    StatementItemId,
};

use crate::ledger::types::{AccountKind, AccountRef, DocumentRef, MovementState};
use crate::registry::types::CheckState;

/// Result type alias using `TreasuryError`.
pub type TreasuryResult<T> = Result<T, TreasuryError>;

/// Errors that can occur during treasury operations.
#[derive(Debug, Error)]
pub enum TreasuryError {
    // ========== Validation Errors ==========
    /// A movement must target exactly one account.
    #[error("Movement must target exactly one account, got {count}")]
    InvalidTarget {
        /// Number of account references supplied.
        count: usize,
    },

    /// Movement amounts must be strictly positive; the direction carries the sign.
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// Movement currency differs from the target account currency.
    #[error("Currency mismatch: account is {expected}, movement is {actual}")]
    CurrencyMismatch {
        /// The account currency.
        expected: String,
        /// The movement currency.
        actual: String,
    },

    /// Movements start PENDING or CONFIRMED.
    #[error("Movements cannot be recorded as {0}")]
    InvalidInitialState(MovementState),

    /// A payment leg carries an amount but no account reference.
    #[error("Missing account reference for {0} leg")]
    MissingLegAccount(String),

    /// A leg of a composed operation was rejected.
    #[error("Leg {leg} rejected: {source}")]
    LegRejected {
        /// Name of the rejected leg (e.g. `cash`, `transfer`, `check[1]`).
        leg: String,
        /// Why the leg was rejected.
        #[source]
        source: Box<TreasuryError>,
    },

    /// Legs of a composed operation do not add up to its declared total.
    #[error("Declared total {declared} does not match legs total {computed}")]
    TotalMismatch {
        /// Total declared by the caller.
        declared: Decimal,
        /// Sum of the non-zero legs.
        computed: Decimal,
    },

    /// A composed operation has no non-zero leg.
    #[error("Operation has no non-zero legs")]
    EmptyOperation,

    /// The movement account type is not compatible with the statement.
    #[error("Account type mismatch: statement is {item}, movement is {movement}")]
    AccountTypeMismatch {
        /// Account type of the statement item.
        item: AccountKind,
        /// Account type of the movement.
        movement: AccountKind,
    },

    /// The movement belongs to another bank account than the statement.
    #[error("Movement belongs to bank account {movement}, statement to {statement}")]
    AccountMismatch {
        /// Bank account of the statement.
        statement: BankAccountId,
        /// Bank account of the movement.
        movement: BankAccountId,
    },

    /// A statement line must carry exactly one positive side.
    #[error("Statement line {line} must have exactly one positive debit or credit")]
    InvalidStatementLine {
        /// Zero-based position of the line in the import.
        line: usize,
    },

    /// A reversal needs a reason.
    #[error("Reversal reason is required")]
    ReversalReasonRequired,

    /// Approving a closing with a variance needs a note.
    #[error("Approval note is required")]
    ApprovalNoteRequired,

    /// Parking an item in suspense needs a note.
    #[error("Suspense note is required")]
    SuspenseNoteRequired,

    // ========== Not Found ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountRef),

    /// Movement not found.
    #[error("Movement not found: {0}")]
    MovementNotFound(MovementId),

    /// Check not found.
    #[error("Check not found: {0}")]
    CheckNotFound(CheckId),

    /// Document has no movements.
    #[error("No movements found for document {0}")]
    DocumentNotFound(DocumentRef),

    /// Cash closing not found.
    #[error("Cash closing not found: {0}")]
    ClosingNotFound(CashClosingId),

    /// Bank statement not found.
    #[error("Bank statement not found: {0}")]
    StatementNotFound(StatementId),

    /// Bank statement item not found.
    #[error("Bank statement item not found: {0}")]
    StatementItemNotFound(StatementItemId),

    // ========== Consistency Errors ==========
    /// The movement has already been reversed.
    #[error("Movement {0} is already reversed")]
    AlreadyReversed(MovementId),

    /// The movement is pending and has no balance effect yet.
    #[error("Movement {0} is not confirmed")]
    MovementNotConfirmed(MovementId),

    /// Only PENDING movements can be confirmed.
    #[error("Movement {0} is not pending")]
    MovementNotPending(MovementId),

    /// Reversal movements are final.
    #[error("Movement {0} is a reversal and cannot be reversed")]
    CannotReverseReversal(MovementId),

    /// The statement item is already reconciled.
    #[error("Statement item {0} is already reconciled")]
    ItemAlreadyReconciled(StatementItemId),

    /// The movement is already reconciled to a statement item.
    #[error("Movement {0} is already reconciled")]
    MovementAlreadyReconciled(MovementId),

    /// The check is not in the state required by the operation.
    #[error("Check {check_id} is {actual}, expected {expected}")]
    CheckStateConflict {
        /// The check.
        check_id: CheckId,
        /// Required state.
        expected: CheckState,
        /// Current state.
        actual: CheckState,
    },

    /// The check is held by another cash drawer.
    #[error("Check {check_id} is held by cash account {holder}")]
    CheckNotInDrawer {
        /// The check.
        check_id: CheckId,
        /// The drawer holding the check.
        holder: CashAccountId,
    },

    /// The drawer already has a closing waiting for approval.
    #[error("Cash account has a closing pending approval: {0}")]
    ClosingPendingApproval(CashClosingId),

    /// The closing is no longer pending.
    #[error("Cash closing {0} is already approved")]
    ClosingAlreadyApproved(CashClosingId),

    // ========== Concurrency / Storage ==========
    /// A concurrent writer won a compare-and-set or a unique index.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TreasuryError {
    /// Wraps an error as the rejection of one leg of a composed operation.
    #[must_use]
    pub fn for_leg(self, leg: impl Into<String>) -> Self {
        Self::LegRejected {
            leg: leg.into(),
            source: Box::new(self),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTarget { .. } => "INVALID_TARGET",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::InvalidInitialState(_) => "INVALID_INITIAL_STATE",
            Self::MissingLegAccount(_) => "MISSING_LEG_ACCOUNT",
            Self::LegRejected { .. } => "LEG_REJECTED",
            Self::TotalMismatch { .. } => "TOTAL_MISMATCH",
            Self::EmptyOperation => "EMPTY_OPERATION",
            Self::AccountTypeMismatch { .. } => "ACCOUNT_TYPE_MISMATCH",
            Self::AccountMismatch { .. } => "ACCOUNT_MISMATCH",
            Self::InvalidStatementLine { .. } => "INVALID_STATEMENT_LINE",
            Self::ReversalReasonRequired => "REVERSAL_REASON_REQUIRED",
            Self::ApprovalNoteRequired => "APPROVAL_NOTE_REQUIRED",
            Self::SuspenseNoteRequired => "SUSPENSE_NOTE_REQUIRED",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::MovementNotFound(_) => "MOVEMENT_NOT_FOUND",
            Self::CheckNotFound(_) => "CHECK_NOT_FOUND",
            Self::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            Self::ClosingNotFound(_) => "CLOSING_NOT_FOUND",
            Self::StatementNotFound(_) => "STATEMENT_NOT_FOUND",
            Self::StatementItemNotFound(_) => "STATEMENT_ITEM_NOT_FOUND",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::MovementNotConfirmed(_) => "MOVEMENT_NOT_CONFIRMED",
            Self::MovementNotPending(_) => "MOVEMENT_NOT_PENDING",
            Self::CannotReverseReversal(_) => "CANNOT_REVERSE_REVERSAL",
            Self::ItemAlreadyReconciled(_) | Self::MovementAlreadyReconciled(_) => {
                "ALREADY_RECONCILED"
            }
            Self::CheckStateConflict { .. } => "CHECK_STATE_CONFLICT",
            Self::CheckNotInDrawer { .. } => "CHECK_NOT_IN_DRAWER",
            Self::ClosingPendingApproval(_) => "CLOSING_PENDING_APPROVAL",
            Self::ClosingAlreadyApproved(_) => "CLOSING_ALREADY_APPROVED",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidTarget { .. }
            | Self::NonPositiveAmount(_)
            | Self::CurrencyMismatch { .. }
            | Self::InvalidInitialState(_)
            | Self::MissingLegAccount(_)
            | Self::LegRejected { .. }
            | Self::TotalMismatch { .. }
            | Self::EmptyOperation
            | Self::AccountTypeMismatch { .. }
            | Self::AccountMismatch { .. }
            | Self::InvalidStatementLine { .. }
            | Self::ReversalReasonRequired
            | Self::ApprovalNoteRequired
            | Self::SuspenseNoteRequired => 400,

            // 404 Not Found
            Self::AccountNotFound(_)
            | Self::MovementNotFound(_)
            | Self::CheckNotFound(_)
            | Self::DocumentNotFound(_)
            | Self::ClosingNotFound(_)
            | Self::StatementNotFound(_)
            | Self::StatementItemNotFound(_) => 404,

            // 409 Conflict - state and concurrency errors
            Self::AlreadyReversed(_)
            | Self::MovementNotPending(_)
            | Self::ItemAlreadyReconciled(_)
            | Self::MovementAlreadyReconciled(_)
            | Self::CheckStateConflict { .. }
            | Self::ClosingPendingApproval(_)
            | Self::ClosingAlreadyApproved(_)
            | Self::ConcurrentModification => 409,

            // 422 Unprocessable - the target exists but the rule forbids it
            Self::MovementNotConfirmed(_)
            | Self::CannotReverseReversal(_)
            | Self::CheckNotInDrawer { .. } => 422,

            // 500 Internal Server Error
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            TreasuryError::InvalidTarget { count: 2 }.error_code(),
            "INVALID_TARGET"
        );
        assert_eq!(
            TreasuryError::NonPositiveAmount(dec!(0)).error_code(),
            "NON_POSITIVE_AMOUNT"
        );
        assert_eq!(
            TreasuryError::AlreadyReversed(MovementId::new()).error_code(),
            "ALREADY_REVERSED"
        );
        assert_eq!(
            TreasuryError::ItemAlreadyReconciled(StatementItemId::new()).error_code(),
            "ALREADY_RECONCILED"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(TreasuryError::EmptyOperation.http_status_code(), 400);
        assert_eq!(
            TreasuryError::MovementNotFound(MovementId::new()).http_status_code(),
            404
        );
        assert_eq!(
            TreasuryError::AlreadyReversed(MovementId::new()).http_status_code(),
            409
        );
        assert_eq!(
            TreasuryError::CannotReverseReversal(MovementId::new()).http_status_code(),
            422
        );
        assert_eq!(
            TreasuryError::Database("boom".to_string()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(TreasuryError::ConcurrentModification.is_retryable());
        assert!(!TreasuryError::EmptyOperation.is_retryable());
        assert!(!TreasuryError::AlreadyReversed(MovementId::new()).is_retryable());
    }

    #[test]
    fn test_leg_rejection_names_the_leg() {
        let err = TreasuryError::MissingLegAccount("transfer".to_string()).for_leg("transfer");
        assert_eq!(err.error_code(), "LEG_REJECTED");
        assert_eq!(
            err.to_string(),
            "Leg transfer rejected: Missing account reference for transfer leg"
        );
    }

    #[test]
    fn test_error_display() {
        let err = TreasuryError::TotalMismatch {
            declared: dec!(1000.00),
            computed: dec!(900.00),
        };
        assert_eq!(
            err.to_string(),
            "Declared total 1000.00 does not match legs total 900.00"
        );
    }
}
