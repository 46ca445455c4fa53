//! Matching strategies.
//!
//! A strategy looks at one statement line and one movement and either
//! proposes a confidence or declines. Strategies know nothing about the
//! assignment loop, so new ones plug in without touching it.

use rust_decimal::Decimal;
use treasury_shared::ReconciliationConfig;

use super::similarity::similarity;
use super::types::{MatchType, StatementItem};
use crate::ledger::types::Movement;

/// Scores one (statement line, movement) pair.
pub trait MatchStrategy: Send + Sync {
    /// Match type recorded when this strategy wins.
    fn match_type(&self) -> MatchType;

    /// Confidence in `[0, 1]`, or `None` if the pair does not qualify.
    fn score(&self, item: &StatementItem, movement: &Movement) -> Option<Decimal>;
}

/// Same signed amount, booked within a few days of the movement's value date.
#[derive(Debug, Clone, Copy)]
pub struct ExactStrategy {
    /// Allowed drift in days, both ways.
    pub date_tolerance_days: i64,
}

impl MatchStrategy for ExactStrategy {
    fn match_type(&self) -> MatchType {
        MatchType::Exact
    }

    fn score(&self, item: &StatementItem, movement: &Movement) -> Option<Decimal> {
        if item.signed_amount() != movement.signed_amount() {
            return None;
        }
        let drift = (item.date - movement.effective_date()).num_days().abs();
        (drift <= self.date_tolerance_days).then_some(Decimal::ONE)
    }
}

/// The line's reference names the movement's document, regardless of date.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceStrategy {
    /// Confidence assigned to every reference hit.
    pub confidence: Decimal,
}

fn reference_tokens(reference: &str) -> impl Iterator<Item = &str> {
    reference
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':'))
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty())
}

impl MatchStrategy for ReferenceStrategy {
    fn match_type(&self) -> MatchType {
        MatchType::Reference
    }

    fn score(&self, item: &StatementItem, movement: &Movement) -> Option<Decimal> {
        let reference = item.reference.as_deref()?;
        let document = movement.document.as_ref()?;
        let wanted = document.reference_id.trim();
        if wanted.is_empty() || item.direction() != movement.direction {
            return None;
        }
        reference_tokens(reference)
            .any(|token| token.eq_ignore_ascii_case(wanted))
            .then_some(self.confidence)
    }
}

/// Nearly the same amount and a similar description.
///
/// Confidence grows linearly from 0.5 at the similarity threshold to 0.8
/// for identical normalized text.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyStrategy {
    /// Largest accepted absolute difference between signed amounts.
    pub amount_tolerance: Decimal,
    /// Smallest accepted description similarity.
    pub similarity_threshold: Decimal,
}

const FUZZY_FLOOR: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
const FUZZY_SPAN: Decimal = Decimal::from_parts(3, 0, 0, false, 1);

impl MatchStrategy for FuzzyStrategy {
    fn match_type(&self) -> MatchType {
        MatchType::Fuzzy
    }

    fn score(&self, item: &StatementItem, movement: &Movement) -> Option<Decimal> {
        if (item.signed_amount() - movement.signed_amount()).abs() > self.amount_tolerance {
            return None;
        }
        let score = similarity(&item.description, &movement.description);
        if score < self.similarity_threshold || score.is_zero() {
            return None;
        }

        let room = Decimal::ONE - self.similarity_threshold;
        if room <= Decimal::ZERO {
            return Some(FUZZY_FLOOR + FUZZY_SPAN);
        }
        let scaled = FUZZY_FLOOR + FUZZY_SPAN * (score - self.similarity_threshold) / room;
        Some(scaled.round_dp(4))
    }
}

/// EXACT, REFERENCE, FUZZY in priority order.
#[must_use]
pub fn default_strategies(config: &ReconciliationConfig) -> Vec<Box<dyn MatchStrategy>> {
    vec![
        Box::new(ExactStrategy {
            date_tolerance_days: config.date_tolerance_days,
        }),
        Box::new(ReferenceStrategy {
            confidence: config.reference_confidence,
        }),
        Box::new(FuzzyStrategy {
            amount_tolerance: config.amount_tolerance,
            similarity_threshold: config.similarity_threshold,
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{
        AccountRef, Direction, DocumentRef, MovementState, PaymentMedium,
    };
    use crate::reconciliation::types::ItemStatus;
    use crate::testing::date;
    use chrono::{NaiveDate, Utc};
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use treasury_shared::types::{
        ActorId, BankAccountId, CompanyId, MovementId, StatementId, StatementItemId,
    };

    fn item(on: NaiveDate, credit: Decimal, description: &str, reference: Option<&str>) -> StatementItem {
        StatementItem {
            id: StatementItemId::new(),
            company_id: CompanyId::new(),
            statement_id: StatementId::new(),
            bank_account_id: BankAccountId::new(),
            date: on,
            description: description.to_string(),
            reference: reference.map(str::to_string),
            debit: Decimal::ZERO,
            credit,
            status: ItemStatus::Unreconciled,
            match_type: None,
            confidence: None,
            movement_id: None,
            suspense_note: None,
            reconciled_at: None,
            reconciled_by: None,
        }
    }

    fn movement(on: NaiveDate, amount: Decimal, description: &str, document: Option<&str>) -> Movement {
        Movement {
            id: MovementId::new(),
            company_id: CompanyId::new(),
            date: on,
            value_date: None,
            direction: Direction::Inflow,
            medium: PaymentMedium::Transfer,
            amount,
            currency: "USD".to_string(),
            target: AccountRef::Bank(BankAccountId::new()),
            description: description.to_string(),
            document: document.map(|id| DocumentRef::new("PAYMENT", id)),
            state: MovementState::Confirmed,
            reversal_of_id: None,
            reversed_by_id: None,
            reconciled_item_id: None,
            created_by: ActorId::new(),
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[case(date(2024, 3, 10), Some(Decimal::ONE))]
    #[case(date(2024, 3, 13), Some(Decimal::ONE))]
    #[case(date(2024, 3, 7), Some(Decimal::ONE))]
    #[case(date(2024, 3, 14), None)]
    fn test_exact_date_tolerance(#[case] booked: NaiveDate, #[case] expected: Option<Decimal>) {
        let strategy = ExactStrategy { date_tolerance_days: 3 };
        let line = item(booked, dec!(5000), "", None);
        let mv = movement(date(2024, 3, 10), dec!(5000), "", None);
        assert_eq!(strategy.score(&line, &mv), expected);
    }

    #[test]
    fn test_exact_uses_value_date() {
        let strategy = ExactStrategy { date_tolerance_days: 0 };
        let line = item(date(2024, 3, 12), dec!(5000), "", None);
        let mut mv = movement(date(2024, 3, 10), dec!(5000), "", None);
        assert_eq!(strategy.score(&line, &mv), None);

        mv.value_date = Some(date(2024, 3, 12));
        assert_eq!(strategy.score(&line, &mv), Some(Decimal::ONE));
    }

    #[test]
    fn test_exact_requires_same_sign() {
        let strategy = ExactStrategy { date_tolerance_days: 3 };
        let line = item(date(2024, 3, 10), dec!(5000), "", None);
        let mut mv = movement(date(2024, 3, 10), dec!(5000), "", None);
        mv.direction = Direction::Outflow;
        assert_eq!(strategy.score(&line, &mv), None);
    }

    #[rstest]
    #[case(Some("TRF PAY-1001 ACME"), Some(dec!(0.85)))]
    #[case(Some("ref:pay-1001;"), Some(dec!(0.85)))]
    #[case(Some("PAY-10011"), None)]
    #[case(None, None)]
    fn test_reference_tokens(#[case] reference: Option<&str>, #[case] expected: Option<Decimal>) {
        let strategy = ReferenceStrategy { confidence: dec!(0.85) };
        let line = item(date(2024, 4, 20), dec!(4999), "", reference);
        let mv = movement(date(2024, 3, 10), dec!(5000), "", Some("PAY-1001"));
        assert_eq!(strategy.score(&line, &mv), expected);
    }

    #[test]
    fn test_reference_without_document_declines() {
        let strategy = ReferenceStrategy { confidence: dec!(0.85) };
        let line = item(date(2024, 3, 10), dec!(5000), "", Some("PAY-1001"));
        let mv = movement(date(2024, 3, 10), dec!(5000), "", None);
        assert_eq!(strategy.score(&line, &mv), None);
    }

    #[test]
    fn test_fuzzy_scales_with_similarity() {
        let strategy = FuzzyStrategy {
            amount_tolerance: dec!(0.01),
            similarity_threshold: dec!(0.60),
        };
        let mv = movement(date(2024, 3, 10), dec!(5000), "ACME Corp invoice 77", None);

        let identical = item(date(2024, 3, 20), dec!(5000.01), "acme corp / invoice 77", None);
        assert_eq!(strategy.score(&identical, &mv), Some(dec!(0.8)));

        let close = item(date(2024, 3, 20), dec!(5000), "ACME Corp invoice 78", None);
        let confidence = strategy.score(&close, &mv).unwrap();
        assert!(confidence > dec!(0.5) && confidence < dec!(0.8));

        let unrelated = item(date(2024, 3, 20), dec!(5000), "Payroll March", None);
        assert_eq!(strategy.score(&unrelated, &mv), None);

        let too_far = item(date(2024, 3, 20), dec!(5000.02), "ACME Corp invoice 77", None);
        assert_eq!(strategy.score(&too_far, &mv), None);
    }

    #[test]
    fn test_fuzzy_threshold_of_one() {
        let strategy = FuzzyStrategy {
            amount_tolerance: Decimal::ZERO,
            similarity_threshold: Decimal::ONE,
        };
        let mv = movement(date(2024, 3, 10), dec!(10), "Fee", None);
        let line = item(date(2024, 3, 10), dec!(10), "FEE", None);
        assert_eq!(strategy.score(&line, &mv), Some(dec!(0.8)));
    }

    #[test]
    fn test_fuzzy_band_bounds() {
        assert_eq!(FUZZY_FLOOR, dec!(0.5));
        assert_eq!(FUZZY_FLOOR + FUZZY_SPAN, dec!(0.8));
    }

    #[test]
    fn test_default_priority() {
        let strategies = default_strategies(&ReconciliationConfig::default());
        let order: Vec<_> = strategies.iter().map(|s| s.match_type()).collect();
        assert_eq!(order, vec![MatchType::Exact, MatchType::Reference, MatchType::Fuzzy]);
    }
}
