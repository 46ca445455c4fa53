//! Bank reconciliation.
//!
//! This module provides:
//! - Statement import and line/match types
//! - Pluggable matching strategies (EXACT, REFERENCE, FUZZY)
//! - Greedy one-to-one assignment of scored pairs
//! - The reconciliation service (auto-match, manual match, unmatch)

pub mod matcher;
pub mod service;
pub mod similarity;
pub mod strategy;
pub mod types;

#[cfg(test)]
mod matcher_props;

pub use matcher::{Candidate, assign, score_pairs};
pub use service::ReconciliationService;
pub use strategy::{
    ExactStrategy, FuzzyStrategy, MatchStrategy, ReferenceStrategy, default_strategies,
};
pub use types::{
    AutoMatchReport, BankStatement, ImportStatementInput, ImportedStatement, ItemStatus,
    MatchOutcome, MatchType, StatementItem, StatementLineInput, StatementSummary,
};
