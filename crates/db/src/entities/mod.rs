//! `SeaORM` entities for the treasury tables.

pub mod bank_accounts;
pub mod bank_statement_items;
pub mod bank_statements;
pub mod cash_accounts;
pub mod cash_closings;
pub mod checks;
pub mod movements;
