//! Bank statement and reconciliation types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use treasury_shared::types::{
    ActorId, BankAccountId, CompanyId, MovementId, StatementId, StatementItemId,
};

use crate::ledger::types::Direction;

string_enum! {
    /// Reconciliation status of a statement line.
    pub enum ItemStatus {
        /// Waiting for a match.
        Unreconciled => "UNRECONCILED",
        /// Linked to a movement.
        Reconciled => "RECONCILED",
        /// Parked for investigation.
        Suspense => "SUSPENSE",
    }
}

string_enum! {
    /// How a statement line was matched.
    pub enum MatchType {
        /// Same signed amount within the date tolerance.
        Exact => "EXACT",
        /// Close amount and similar description.
        Fuzzy => "FUZZY",
        /// Line reference names the movement's document.
        Reference => "REFERENCE",
        /// Chosen by a user.
        Manual => "MANUAL",
    }
}

/// An imported bank statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankStatement {
    /// Statement ID.
    pub id: StatementId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Bank account the statement belongs to.
    pub bank_account_id: BankAccountId,
    /// First day covered.
    pub period_start: NaiveDate,
    /// Last day covered.
    pub period_end: NaiveDate,
    /// Who imported it.
    pub imported_by: ActorId,
    /// When it was imported.
    pub imported_at: DateTime<Utc>,
}

/// One line of a bank statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementItem {
    /// Item ID.
    pub id: StatementItemId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Statement the line belongs to.
    pub statement_id: StatementId,
    /// Bank account of the statement.
    pub bank_account_id: BankAccountId,
    /// Booking date at the bank.
    pub date: NaiveDate,
    /// Bank description.
    pub description: String,
    /// Free-text reference supplied by the bank.
    pub reference: Option<String>,
    /// Money out of the account.
    pub debit: Decimal,
    /// Money into the account.
    pub credit: Decimal,
    /// Reconciliation status.
    pub status: ItemStatus,
    /// How the line was matched.
    pub match_type: Option<MatchType>,
    /// Match confidence in `[0, 1]`.
    pub confidence: Option<Decimal>,
    /// Linked movement.
    pub movement_id: Option<MovementId>,
    /// Why the line is parked.
    pub suspense_note: Option<String>,
    /// When it was matched.
    pub reconciled_at: Option<DateTime<Utc>>,
    /// Who matched it.
    pub reconciled_by: Option<ActorId>,
}

impl StatementItem {
    /// Credit as a positive amount, debit as a negative one.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.credit - self.debit
    }

    /// Direction of the line from the account's point of view.
    #[must_use]
    pub fn direction(&self) -> Direction {
        if self.credit > Decimal::ZERO {
            Direction::Inflow
        } else {
            Direction::Outflow
        }
    }

    /// Links the line to a movement.
    pub fn reconcile(
        &mut self,
        movement_id: MovementId,
        match_type: MatchType,
        confidence: Decimal,
        actor: ActorId,
    ) {
        self.status = ItemStatus::Reconciled;
        self.match_type = Some(match_type);
        self.confidence = Some(confidence);
        self.movement_id = Some(movement_id);
        self.reconciled_at = Some(Utc::now());
        self.reconciled_by = Some(actor);
    }

    /// Drops any match metadata and returns the line to UNRECONCILED.
    pub fn clear_match(&mut self) {
        self.status = ItemStatus::Unreconciled;
        self.match_type = None;
        self.confidence = None;
        self.movement_id = None;
        self.reconciled_at = None;
        self.reconciled_by = None;
    }
}

/// A normalized statement line to import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementLineInput {
    /// Booking date.
    pub date: NaiveDate,
    /// Bank description.
    #[serde(default)]
    pub description: String,
    /// Bank reference.
    #[serde(default)]
    pub reference: Option<String>,
    /// Money out.
    #[serde(default)]
    pub debit: Decimal,
    /// Money in.
    #[serde(default)]
    pub credit: Decimal,
}

impl StatementLineInput {
    /// Exactly one side must be positive and neither negative.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let debit = self.debit > Decimal::ZERO;
        let credit = self.credit > Decimal::ZERO;
        debit != credit && !self.debit.is_sign_negative() && !self.credit.is_sign_negative()
    }
}

/// Input for importing a statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStatementInput {
    /// Bank account the statement belongs to.
    pub bank_account_id: BankAccountId,
    /// First day covered.
    pub period_start: NaiveDate,
    /// Last day covered.
    pub period_end: NaiveDate,
    /// Statement lines.
    pub lines: Vec<StatementLineInput>,
}

/// An imported statement with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct ImportedStatement {
    /// Header.
    pub statement: BankStatement,
    /// Lines, in import order.
    pub items: Vec<StatementItem>,
}

/// One pair committed by auto-match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    /// Statement line.
    pub item_id: StatementItemId,
    /// Movement.
    pub movement_id: MovementId,
    /// Strategy that produced the pair.
    pub match_type: MatchType,
    /// Confidence.
    pub confidence: Decimal,
}

/// Result of an auto-match pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoMatchReport {
    /// Statement processed.
    pub statement_id: StatementId,
    /// UNRECONCILED lines considered.
    pub candidates: usize,
    /// Pairs committed.
    pub matched: Vec<MatchOutcome>,
    /// Pairs dropped because the movement was taken concurrently.
    pub skipped: usize,
    /// Lines still UNRECONCILED.
    pub unmatched: usize,
}

/// Counts of a statement's lines by status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementSummary {
    /// Statement.
    pub statement_id: StatementId,
    /// Total lines.
    pub total_items: usize,
    /// RECONCILED lines.
    pub reconciled: usize,
    /// UNRECONCILED lines.
    pub unreconciled: usize,
    /// SUSPENSE lines.
    pub suspense: usize,
    /// Sum of credits.
    pub total_credits: Decimal,
    /// Sum of debits.
    pub total_debits: Decimal,
    /// Every line is RECONCILED.
    pub is_fully_reconciled: bool,
    /// No line is UNRECONCILED; SUSPENSE lines count as parked.
    pub is_resolved: bool,
}

impl StatementSummary {
    /// Summarizes a statement's lines.
    #[must_use]
    pub fn from_items(statement_id: StatementId, items: &[StatementItem]) -> Self {
        let count = |status: ItemStatus| items.iter().filter(|i| i.status == status).count();
        let reconciled = count(ItemStatus::Reconciled);
        let unreconciled = count(ItemStatus::Unreconciled);
        Self {
            statement_id,
            total_items: items.len(),
            reconciled,
            unreconciled,
            suspense: count(ItemStatus::Suspense),
            total_credits: items.iter().map(|i| i.credit).sum(),
            total_debits: items.iter().map(|i| i.debit).sum(),
            is_fully_reconciled: reconciled == items.len(),
            is_resolved: unreconciled == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn line(debit: Decimal, credit: Decimal) -> StatementLineInput {
        StatementLineInput {
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            description: String::new(),
            reference: None,
            debit,
            credit,
        }
    }

    #[rstest]
    #[case(dec!(0), dec!(5000), true)]
    #[case(dec!(120.50), dec!(0), true)]
    #[case(dec!(0), dec!(0), false)]
    #[case(dec!(10), dec!(10), false)]
    #[case(dec!(-10), dec!(0), false)]
    #[case(dec!(-10), dec!(20), false)]
    fn test_line_validity(#[case] debit: Decimal, #[case] credit: Decimal, #[case] valid: bool) {
        assert_eq!(line(debit, credit).is_valid(), valid);
    }

    #[test]
    fn test_summary_distinguishes_parked_from_reconciled() {
        let statement_id = StatementId::new();
        let mut parked = StatementItem {
            id: StatementItemId::new(),
            company_id: CompanyId::new(),
            statement_id,
            bank_account_id: BankAccountId::new(),
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            description: "FEE".to_string(),
            reference: None,
            debit: dec!(12),
            credit: Decimal::ZERO,
            status: ItemStatus::Suspense,
            match_type: None,
            confidence: None,
            movement_id: None,
            suspense_note: Some("unknown fee".to_string()),
            reconciled_at: None,
            reconciled_by: None,
        };
        let mut matched = parked.clone();
        matched.id = StatementItemId::new();
        matched.debit = Decimal::ZERO;
        matched.credit = dec!(5000);
        matched.reconcile(MovementId::new(), MatchType::Exact, Decimal::ONE, ActorId::new());

        let summary = StatementSummary::from_items(statement_id, &[parked.clone(), matched.clone()]);
        assert!(summary.is_resolved);
        assert!(!summary.is_fully_reconciled);
        assert_eq!(summary.total_credits, dec!(5000));
        assert_eq!(summary.total_debits, dec!(12));

        parked.status = ItemStatus::Unreconciled;
        let summary = StatementSummary::from_items(statement_id, &[parked, matched]);
        assert!(!summary.is_resolved);
        assert_eq!(summary.unreconciled, 1);
    }

    #[test]
    fn test_clear_match_keeps_amounts() {
        let mut item = StatementItem {
            id: StatementItemId::new(),
            company_id: CompanyId::new(),
            statement_id: StatementId::new(),
            bank_account_id: BankAccountId::new(),
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            description: String::new(),
            reference: None,
            debit: Decimal::ZERO,
            credit: dec!(5000),
            status: ItemStatus::Unreconciled,
            match_type: None,
            confidence: None,
            movement_id: None,
            suspense_note: None,
            reconciled_at: None,
            reconciled_by: None,
        };
        item.reconcile(MovementId::new(), MatchType::Manual, Decimal::ONE, ActorId::new());
        item.clear_match();

        assert_eq!(item.status, ItemStatus::Unreconciled);
        assert_eq!(item.movement_id, None);
        assert_eq!(item.signed_amount(), dec!(5000));
        assert_eq!(item.direction(), Direction::Inflow);
    }
}
