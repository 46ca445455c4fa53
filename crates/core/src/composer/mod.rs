//! Transaction composer.
//!
//! Named groupings of movements sharing one document reference:
//! - Client payments (cash, transfer and check legs)
//! - Cash to bank deposits
//! - Cash drawer closings and their approval

pub mod service;
pub mod types;

#[cfg(test)]
mod deposit_props;

pub use service::{CASH_CLOSING_DOCUMENT, ComposerService};
pub use types::{
    CashClosing, CashClosingInput, CashDepositInput, CashDepositResult, CheckLegInput,
    ClientPaymentInput, ClientPaymentResult, ClosingApproval, ClosingState, DepositPlan,
    PaymentLegTotals,
};
