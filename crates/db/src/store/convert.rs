//! Row ↔ domain conversions.
//!
//! Enum columns are stored as their upper-case text; a value that does not
//! parse is reported as a database error.

use std::str::FromStr;

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use treasury_core::TreasuryError;
use treasury_core::composer::types::CashClosing;
use treasury_core::ledger::types::{AccountRef, DocumentRef, Movement};
use treasury_core::reconciliation::types::{BankStatement, StatementItem};
use treasury_core::registry::types::{BankAccount, CashAccount, Check};
use treasury_shared::types::{
    ActorId, BankAccountId, CashAccountId, CashClosingId, CheckId, CompanyId, MovementId,
    StatementId, StatementItemId,
};

use crate::entities::{
    bank_accounts, bank_statement_items, bank_statements, cash_accounts, cash_closings, checks,
    movements,
};

fn parse<T: FromStr<Err = String>>(column: &str, text: &str) -> Result<T, TreasuryError> {
    text.parse()
        .map_err(|e| TreasuryError::Database(format!("invalid {column}: {e}")))
}

// ========== Accounts ==========

impl From<cash_accounts::Model> for CashAccount {
    fn from(m: cash_accounts::Model) -> Self {
        Self {
            id: CashAccountId::from_uuid(m.id),
            company_id: CompanyId::from_uuid(m.company_id),
            name: m.name,
            currency: m.currency,
            balance: m.balance,
            portfolio_balance: m.portfolio_balance,
            created_at: m.created_at.with_timezone(&Utc),
        }
    }
}

pub(crate) fn cash_account_row(a: &CashAccount) -> cash_accounts::ActiveModel {
    cash_accounts::ActiveModel {
        id: Set(a.id.into_inner()),
        company_id: Set(a.company_id.into_inner()),
        name: Set(a.name.clone()),
        currency: Set(a.currency.clone()),
        balance: Set(a.balance),
        portfolio_balance: Set(a.portfolio_balance),
        created_at: Set(a.created_at.into()),
    }
}

impl From<bank_accounts::Model> for BankAccount {
    fn from(m: bank_accounts::Model) -> Self {
        Self {
            id: BankAccountId::from_uuid(m.id),
            company_id: CompanyId::from_uuid(m.company_id),
            name: m.name,
            bank_name: m.bank_name,
            account_number: m.account_number,
            currency: m.currency,
            balance: m.balance,
            created_at: m.created_at.with_timezone(&Utc),
        }
    }
}

pub(crate) fn bank_account_row(a: &BankAccount) -> bank_accounts::ActiveModel {
    bank_accounts::ActiveModel {
        id: Set(a.id.into_inner()),
        company_id: Set(a.company_id.into_inner()),
        name: Set(a.name.clone()),
        bank_name: Set(a.bank_name.clone()),
        account_number: Set(a.account_number.clone()),
        currency: Set(a.currency.clone()),
        balance: Set(a.balance),
        created_at: Set(a.created_at.into()),
    }
}

// ========== Checks ==========

impl TryFrom<checks::Model> for Check {
    type Error = TreasuryError;

    fn try_from(m: checks::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CheckId::from_uuid(m.id),
            company_id: CompanyId::from_uuid(m.company_id),
            number: m.number,
            bank_name: m.bank_name,
            issuer: m.issuer,
            amount: m.amount,
            currency: m.currency,
            due_date: m.due_date,
            state: parse("check state", &m.state)?,
            custody_account_id: CashAccountId::from_uuid(m.custody_account_id),
            deposited_into: m.deposited_into.map(BankAccountId::from_uuid),
            created_at: m.created_at.with_timezone(&Utc),
        })
    }
}

pub(crate) fn check_row(c: &Check) -> checks::ActiveModel {
    checks::ActiveModel {
        id: Set(c.id.into_inner()),
        company_id: Set(c.company_id.into_inner()),
        number: Set(c.number.clone()),
        bank_name: Set(c.bank_name.clone()),
        issuer: Set(c.issuer.clone()),
        amount: Set(c.amount),
        currency: Set(c.currency.clone()),
        due_date: Set(c.due_date),
        state: Set(c.state.as_str().to_string()),
        custody_account_id: Set(c.custody_account_id.into_inner()),
        deposited_into: Set(c.deposited_into.map(BankAccountId::into_inner)),
        created_at: Set(c.created_at.into()),
    }
}

// ========== Movements ==========

impl TryFrom<movements::Model> for Movement {
    type Error = TreasuryError;

    fn try_from(m: movements::Model) -> Result<Self, Self::Error> {
        let target = AccountRef::from_parts(
            m.cash_account_id.map(CashAccountId::from_uuid),
            m.bank_account_id.map(BankAccountId::from_uuid),
            m.check_id.map(CheckId::from_uuid),
        )
        .map_err(|e| TreasuryError::Database(format!("movement {}: {e}", m.id)))?;
        let document = match (m.reference_type, m.reference_id) {
            (Some(reference_type), Some(reference_id)) => {
                Some(DocumentRef::new(reference_type, reference_id))
            }
            _ => None,
        };

        Ok(Self {
            id: MovementId::from_uuid(m.id),
            company_id: CompanyId::from_uuid(m.company_id),
            date: m.date,
            value_date: m.value_date,
            direction: parse("direction", &m.direction)?,
            medium: parse("medium", &m.medium)?,
            amount: m.amount,
            currency: m.currency,
            target,
            description: m.description,
            document,
            state: parse("movement state", &m.state)?,
            reversal_of_id: m.reversal_of_id.map(MovementId::from_uuid),
            reversed_by_id: m.reversed_by_id.map(MovementId::from_uuid),
            reconciled_item_id: m.reconciled_item_id.map(StatementItemId::from_uuid),
            created_by: ActorId::from_uuid(m.created_by),
            created_at: m.created_at.with_timezone(&Utc),
        })
    }
}

pub(crate) fn movement_row(m: &Movement) -> movements::ActiveModel {
    movements::ActiveModel {
        id: Set(m.id.into_inner()),
        company_id: Set(m.company_id.into_inner()),
        date: Set(m.date),
        value_date: Set(m.value_date),
        direction: Set(m.direction.as_str().to_string()),
        medium: Set(m.medium.as_str().to_string()),
        amount: Set(m.amount),
        currency: Set(m.currency.clone()),
        account_kind: Set(m.target.kind().as_str().to_string()),
        cash_account_id: Set(m.target.cash_account_id().map(CashAccountId::into_inner)),
        bank_account_id: Set(m.target.bank_account_id().map(BankAccountId::into_inner)),
        check_id: Set(m.target.check_id().map(CheckId::into_inner)),
        description: Set(m.description.clone()),
        reference_type: Set(m.document.as_ref().map(|d| d.reference_type.clone())),
        reference_id: Set(m.document.as_ref().map(|d| d.reference_id.clone())),
        state: Set(m.state.as_str().to_string()),
        reversal_of_id: Set(m.reversal_of_id.map(MovementId::into_inner)),
        reversed_by_id: Set(m.reversed_by_id.map(MovementId::into_inner)),
        reconciled_item_id: Set(m.reconciled_item_id.map(StatementItemId::into_inner)),
        created_by: Set(m.created_by.into_inner()),
        created_at: Set(m.created_at.into()),
    }
}

// ========== Cash closings ==========

impl TryFrom<cash_closings::Model> for CashClosing {
    type Error = TreasuryError;

    fn try_from(m: cash_closings::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CashClosingId::from_uuid(m.id),
            company_id: CompanyId::from_uuid(m.company_id),
            cash_account_id: CashAccountId::from_uuid(m.cash_account_id),
            date: m.date,
            cash_balance: m.cash_balance,
            portfolio_balance: m.portfolio_balance,
            system_balance: m.system_balance,
            counted: m.counted,
            variance: m.variance,
            state: parse("closing state", &m.state)?,
            note: m.note,
            adjustment_movement_id: m.adjustment_movement_id.map(MovementId::from_uuid),
            created_by: ActorId::from_uuid(m.created_by),
            created_at: m.created_at.with_timezone(&Utc),
            approved_by: m.approved_by.map(ActorId::from_uuid),
            approved_at: m.approved_at.map(|t| t.with_timezone(&Utc)),
        })
    }
}

pub(crate) fn closing_row(c: &CashClosing) -> cash_closings::ActiveModel {
    cash_closings::ActiveModel {
        id: Set(c.id.into_inner()),
        company_id: Set(c.company_id.into_inner()),
        cash_account_id: Set(c.cash_account_id.into_inner()),
        date: Set(c.date),
        cash_balance: Set(c.cash_balance),
        portfolio_balance: Set(c.portfolio_balance),
        system_balance: Set(c.system_balance),
        counted: Set(c.counted),
        variance: Set(c.variance),
        state: Set(c.state.as_str().to_string()),
        note: Set(c.note.clone()),
        adjustment_movement_id: Set(c.adjustment_movement_id.map(MovementId::into_inner)),
        created_by: Set(c.created_by.into_inner()),
        created_at: Set(c.created_at.into()),
        approved_by: Set(c.approved_by.map(ActorId::into_inner)),
        approved_at: Set(c.approved_at.map(Into::into)),
    }
}

// ========== Bank statements ==========

impl From<bank_statements::Model> for BankStatement {
    fn from(m: bank_statements::Model) -> Self {
        Self {
            id: StatementId::from_uuid(m.id),
            company_id: CompanyId::from_uuid(m.company_id),
            bank_account_id: BankAccountId::from_uuid(m.bank_account_id),
            period_start: m.period_start,
            period_end: m.period_end,
            imported_by: ActorId::from_uuid(m.imported_by),
            imported_at: m.imported_at.with_timezone(&Utc),
        }
    }
}

pub(crate) fn statement_row(s: &BankStatement) -> bank_statements::ActiveModel {
    bank_statements::ActiveModel {
        id: Set(s.id.into_inner()),
        company_id: Set(s.company_id.into_inner()),
        bank_account_id: Set(s.bank_account_id.into_inner()),
        period_start: Set(s.period_start),
        period_end: Set(s.period_end),
        imported_by: Set(s.imported_by.into_inner()),
        imported_at: Set(s.imported_at.into()),
    }
}

impl TryFrom<bank_statement_items::Model> for StatementItem {
    type Error = TreasuryError;

    fn try_from(m: bank_statement_items::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: StatementItemId::from_uuid(m.id),
            company_id: CompanyId::from_uuid(m.company_id),
            statement_id: StatementId::from_uuid(m.statement_id),
            bank_account_id: BankAccountId::from_uuid(m.bank_account_id),
            date: m.date,
            description: m.description,
            reference: m.reference,
            debit: m.debit,
            credit: m.credit,
            status: parse("item status", &m.status)?,
            match_type: m
                .match_type
                .as_deref()
                .map(|t| parse("match type", t))
                .transpose()?,
            confidence: m.confidence,
            movement_id: m.movement_id.map(MovementId::from_uuid),
            suspense_note: m.suspense_note,
            reconciled_at: m.reconciled_at.map(|t| t.with_timezone(&Utc)),
            reconciled_by: m.reconciled_by.map(ActorId::from_uuid),
        })
    }
}

pub(crate) fn item_row(i: &StatementItem) -> bank_statement_items::ActiveModel {
    bank_statement_items::ActiveModel {
        id: Set(i.id.into_inner()),
        company_id: Set(i.company_id.into_inner()),
        statement_id: Set(i.statement_id.into_inner()),
        bank_account_id: Set(i.bank_account_id.into_inner()),
        date: Set(i.date),
        description: Set(i.description.clone()),
        reference: Set(i.reference.clone()),
        debit: Set(i.debit),
        credit: Set(i.credit),
        status: Set(i.status.as_str().to_string()),
        match_type: Set(i.match_type.map(|t| t.as_str().to_string())),
        confidence: Set(i.confidence),
        movement_id: Set(i.movement_id.map(MovementId::into_inner)),
        suspense_note: Set(i.suspense_note.clone()),
        reconciled_at: Set(i.reconciled_at.map(Into::into)),
        reconciled_by: Set(i.reconciled_by.map(ActorId::into_inner)),
    }
}
