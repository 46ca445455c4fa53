//! Account registry: cash drawers, bank accounts and checks.
//!
//! Pure state. Balances change only through the ledger.

pub mod service;
pub mod types;

pub use service::RegistryService;
pub use types::{
    BalanceDrift, BalanceTarget, BankAccount, CashAccount, Check, CheckState, IntegrityReport,
    OpenBankAccountInput, OpenCashAccountInput, TreasuryPosition,
};
