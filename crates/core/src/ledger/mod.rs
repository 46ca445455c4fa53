//! Ledger core.
//!
//! This module owns the only path that changes a balance:
//! - Movement and account-target types
//! - In-transaction posting primitives (validate, persist, apply delta)
//! - The ledger service for single movements and pending confirmation

pub mod posting;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use service::LedgerService;
pub use types::{
    AccountKind, AccountRef, Direction, DocumentRef, Movement, MovementState, PaymentMedium,
    RecordMovementInput,
};
