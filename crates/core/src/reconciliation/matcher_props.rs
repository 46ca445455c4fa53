//! Property-based tests for greedy assignment.
//!
//! - No statement line or movement is assigned twice
//! - Every assignment clears the confidence floor
//! - No unassigned pair above the floor is left with both sides free

use std::collections::HashSet;

use proptest::prelude::*;
use rust_decimal::Decimal;
use treasury_shared::types::{MovementId, StatementItemId};

use super::matcher::{Candidate, assign};
use super::types::MatchType;

fn confidence() -> impl Strategy<Value = Decimal> {
    (0u32..=100u32).prop_map(|pct| Decimal::new(i64::from(pct), 2))
}

fn candidates() -> impl Strategy<Value = Vec<Candidate>> {
    (1usize..6, 1usize..6).prop_flat_map(|(items, movements)| {
        let item_ids: Vec<_> = (0..items).map(|_| StatementItemId::new()).collect();
        let movement_ids: Vec<_> = (0..movements).map(|_| MovementId::new()).collect();
        prop::collection::vec(
            (0..items, 0..movements, confidence(), 0i64..10),
            0..20,
        )
        .prop_map(move |pairs| {
            pairs
                .into_iter()
                .map(|(i, m, confidence, date_distance)| Candidate {
                    item_id: item_ids[i],
                    movement_id: movement_ids[m],
                    match_type: MatchType::Fuzzy,
                    confidence,
                    date_distance,
                })
                .collect()
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// *For any* candidate pool, assignment SHALL use each item and each
    /// movement at most once and only pairs at or above the floor.
    #[test]
    fn prop_assignment_is_one_to_one(pool in candidates(), floor in confidence()) {
        let picked = assign(pool, floor);

        let items: HashSet<_> = picked.iter().map(|c| c.item_id).collect();
        let movements: HashSet<_> = picked.iter().map(|c| c.movement_id).collect();
        prop_assert_eq!(items.len(), picked.len());
        prop_assert_eq!(movements.len(), picked.len());
        prop_assert!(picked.iter().all(|c| c.confidence >= floor));
    }

    /// *For any* candidate pool, the assignment SHALL be maximal: no pair at
    /// or above the floor has both sides left free.
    #[test]
    fn prop_assignment_is_maximal(pool in candidates(), floor in confidence()) {
        let picked = assign(pool.clone(), floor);

        let items: HashSet<_> = picked.iter().map(|c| c.item_id).collect();
        let movements: HashSet<_> = picked.iter().map(|c| c.movement_id).collect();
        for candidate in pool.iter().filter(|c| c.confidence >= floor) {
            prop_assert!(
                items.contains(&candidate.item_id) || movements.contains(&candidate.movement_id)
            );
        }
    }
}
