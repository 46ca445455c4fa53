//! Property-based tests for reversals.
//!
//! - Reversal restores the balance that existed before the original
//! - A movement can be reversed at most once
//! - Reversed movements and their offsets cancel out in the integrity check

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::error::TreasuryError;
use crate::ledger::types::{AccountRef, Direction};
use crate::testing::Fixture;

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
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// *For any* movements and any subset reversed, the balance SHALL equal
    /// the signed sum of the movements that were not reversed.
    #[test]
    fn prop_reversed_subset_cancels_out(
        legs in prop::collection::vec((direction(), positive_amount(), any::<bool>()), 1..15),
    ) {
        let (balance, expected, consistent) = block_on(async {
            let fx = Fixture::new().await;
            let mut expected = Decimal::ZERO;
            for (direction, amount, reverse) in &legs {
                let movement = fx.record(AccountRef::Bank(fx.bank.id), *direction, *amount).await;
                if *reverse {
                    fx.reversal().reverse(&fx.ctx, movement.id, "test").await.unwrap();
                } else {
                    expected += movement.signed_amount();
                }
            }
            let report = fx.registry().verify_integrity(&fx.ctx).await.unwrap();
            (fx.bank_balance().await, expected, report.is_consistent())
        });

        prop_assert_eq!(balance, expected);
        prop_assert!(consistent);
    }

    /// *For any* movement, reversing it restores the previous balance and a
    /// second reversal SHALL fail with `AlreadyReversed`.
    #[test]
    fn prop_reverse_is_once_only(
        opening in positive_amount(),
        direction in direction(),
        amount in positive_amount(),
    ) {
        let (before, after, second) = block_on(async {
            let fx = Fixture::new().await;
            fx.record(AccountRef::Cash(fx.cash.id), Direction::Inflow, opening).await;
            let before = fx.cash_balance().await;
            let movement = fx.record(AccountRef::Cash(fx.cash.id), direction, amount).await;
            fx.reversal().reverse(&fx.ctx, movement.id, "first").await.unwrap();
            let after = fx.cash_balance().await;
            let second = fx.reversal().reverse(&fx.ctx, movement.id, "second").await;
            (before, after, second)
        });

        prop_assert_eq!(before, after);
        prop_assert!(matches!(second, Err(TreasuryError::AlreadyReversed(_))));
    }
}
