//! Core treasury logic.
//!
//! This crate contains the ledger and reconciliation engine with ZERO web or
//! database dependencies. Storage is reached only through the
//! [`store::TreasuryStore`] seam.
//!
//! # Modules
//!
//! - `registry` - Cash drawers, bank accounts, checks, position and integrity
//! - `ledger` - Movements and the only path that changes a balance
//! - `composer` - Client payments, cash deposits and cash closings
//! - `reversal` - Offsetting movements for confirmed ones
//! - `reconciliation` - Statement import and matching
//! - `suspense` - Parking statement lines without a match
//! - `store` - Unit-of-work traits and the in-memory store

#[macro_use]
mod macros;

pub mod composer;
pub mod context;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod reconciliation;
pub mod registry;
pub mod reversal;
pub mod store;
pub mod suspense;

#[cfg(test)]
mod testing;

pub use context::OperationContext;
pub use engine::TreasuryEngine;
pub use error::{TreasuryError, TreasuryResult};
