//! Candidate scoring and greedy assignment.
//!
//! Both steps are pure: the service loads the pool, this module decides which
//! pairs to commit.

use std::cmp::Ordering;
use std::collections::HashSet;

use rust_decimal::Decimal;
use treasury_shared::types::{MovementId, StatementItemId};

use super::strategy::MatchStrategy;
use super::types::{MatchType, StatementItem};
use crate::ledger::types::Movement;

/// A scored (statement line, movement) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Statement line.
    pub item_id: StatementItemId,
    /// Movement.
    pub movement_id: MovementId,
    /// Strategy that scored the pair.
    pub match_type: MatchType,
    /// Confidence in `[0, 1]`.
    pub confidence: Decimal,
    /// Days between the line and the movement's effective date.
    pub date_distance: i64,
}

/// Scores every pair with the first strategy that accepts it.
#[must_use]
pub fn score_pairs(
    items: &[StatementItem],
    movements: &[Movement],
    strategies: &[Box<dyn MatchStrategy>],
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for item in items {
        for movement in movements {
            let scored = strategies.iter().find_map(|strategy| {
                strategy
                    .score(item, movement)
                    .map(|confidence| (strategy.match_type(), confidence))
            });
            if let Some((match_type, confidence)) = scored {
                candidates.push(Candidate {
                    item_id: item.id,
                    movement_id: movement.id,
                    match_type,
                    confidence,
                    date_distance: (item.date - movement.effective_date()).num_days().abs(),
                });
            }
        }
    }
    candidates
}

fn rank(left: &Candidate, right: &Candidate) -> Ordering {
    right
        .confidence
        .cmp(&left.confidence)
        .then(left.date_distance.cmp(&right.date_distance))
        .then(left.item_id.cmp(&right.item_id))
        .then(left.movement_id.cmp(&right.movement_id))
}

/// Picks pairs highest confidence first, closest date on ties.
///
/// Each item and each movement is used at most once; pairs below
/// `min_confidence` are never picked.
#[must_use]
pub fn assign(mut candidates: Vec<Candidate>, min_confidence: Decimal) -> Vec<Candidate> {
    candidates.retain(|c| c.confidence >= min_confidence);
    candidates.sort_by(rank);

    let mut taken_items = HashSet::new();
    let mut taken_movements = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| {
            if taken_items.contains(&c.item_id) || taken_movements.contains(&c.movement_id) {
                return false;
            }
            taken_items.insert(c.item_id);
            taken_movements.insert(c.movement_id);
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candidate(
        item_id: StatementItemId,
        movement_id: MovementId,
        confidence: Decimal,
        date_distance: i64,
    ) -> Candidate {
        Candidate {
            item_id,
            movement_id,
            match_type: MatchType::Fuzzy,
            confidence,
            date_distance,
        }
    }

    #[test]
    fn test_highest_confidence_wins() {
        let item = StatementItemId::new();
        let weak = MovementId::new();
        let strong = MovementId::new();

        let picked = assign(
            vec![
                candidate(item, weak, dec!(0.72), 0),
                candidate(item, strong, dec!(0.85), 5),
            ],
            dec!(0.70),
        );
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].movement_id, strong);
    }

    #[test]
    fn test_closest_date_breaks_ties() {
        let item = StatementItemId::new();
        let far = MovementId::new();
        let near = MovementId::new();

        let picked = assign(
            vec![
                candidate(item, far, Decimal::ONE, 3),
                candidate(item, near, Decimal::ONE, 1),
            ],
            dec!(0.70),
        );
        assert_eq!(picked[0].movement_id, near);
    }

    #[test]
    fn test_movement_used_once() {
        let first = StatementItemId::new();
        let second = StatementItemId::new();
        let movement = MovementId::new();
        let other = MovementId::new();

        let picked = assign(
            vec![
                candidate(first, movement, Decimal::ONE, 0),
                candidate(second, movement, Decimal::ONE, 1),
                candidate(second, other, dec!(0.75), 2),
            ],
            dec!(0.70),
        );
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[1].item_id, second);
        assert_eq!(picked[1].movement_id, other);
    }

    #[test]
    fn test_floor_filters_before_assignment() {
        let item = StatementItemId::new();
        let picked = assign(
            vec![candidate(item, MovementId::new(), dec!(0.69), 0)],
            dec!(0.70),
        );
        assert!(picked.is_empty());
    }
}
