//! Property-based tests for the ledger.
//!
//! - Balance equals the signed sum of applied movements
//! - Pending movements never touch a balance until confirmed

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::types::{AccountRef, Direction, MovementState};
use crate::testing::Fixture;

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Inflow), Just(Direction::Outflow)]
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// *For any* sequence of confirmed movements, the drawer balance SHALL
    /// equal their signed sum and the integrity check SHALL pass.
    #[test]
    fn prop_balance_is_signed_sum(
        legs in prop::collection::vec((direction(), positive_amount()), 1..20),
    ) {
        let (balance, expected, consistent) = block_on(async {
            let fx = Fixture::new().await;
            let mut expected = Decimal::ZERO;
            for (direction, amount) in &legs {
                let movement = fx.record(AccountRef::Cash(fx.cash.id), *direction, *amount).await;
                expected += movement.signed_amount();
            }
            let report = fx.registry().verify_integrity(&fx.ctx).await.unwrap();
            (fx.cash_balance().await, expected, report.is_consistent())
        });

        prop_assert_eq!(balance, expected);
        prop_assert!(consistent);
    }

    /// *For any* mix of pending and confirmed movements, only the confirmed
    /// ones SHALL count until the pending ones are confirmed.
    #[test]
    fn prop_pending_applies_only_on_confirmation(
        legs in prop::collection::vec((positive_amount(), any::<bool>()), 1..12),
    ) {
        let (before, after, confirmed_sum, total) = block_on(async {
            let fx = Fixture::new().await;
            let mut pending = Vec::new();
            let mut confirmed_sum = Decimal::ZERO;
            let mut total = Decimal::ZERO;
            for (amount, is_pending) in &legs {
                let state = if *is_pending { MovementState::Pending } else { MovementState::Confirmed };
                let input = fx
                    .input(AccountRef::Bank(fx.bank.id), Direction::Inflow, *amount)
                    .with_state(state);
                let movement = fx.ledger().record_movement(&fx.ctx, input).await.unwrap();
                total += *amount;
                if *is_pending {
                    pending.push(movement.id);
                } else {
                    confirmed_sum += *amount;
                }
            }
            let before = fx.bank_balance().await;
            for id in pending {
                fx.ledger().confirm_pending(&fx.ctx, id).await.unwrap();
            }
            (before, fx.bank_balance().await, confirmed_sum, total)
        });

        prop_assert_eq!(before, confirmed_sum);
        prop_assert_eq!(after, total);
    }
}
