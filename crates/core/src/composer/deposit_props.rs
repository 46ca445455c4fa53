//! Property-based tests for cash deposits.
//!
//! - The bank inflow equals the drawer outflows for any split
//! - The drawer loses exactly what the bank gains

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::types::DepositPlan;
use crate::ledger::types::{AccountRef, Direction, Movement};
use crate::testing::Fixture;

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..500_000i64).prop_map(|cents| Decimal::new(cents, 2))
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

    /// *For any* plan, `total()` SHALL equal cash plus every check.
    #[test]
    fn prop_plan_total_is_sum_of_parts(
        cash in amount(),
        checks in prop::collection::vec(amount(), 0..8),
    ) {
        let plan = DepositPlan {
            cash,
            checks: checks
                .iter()
                .map(|a| (treasury_shared::types::CheckId::new(), *a))
                .collect(),
        };
        prop_assert_eq!(plan.total(), cash + checks.iter().copied().sum::<Decimal>());
    }

    /// *For any* split between cash and checks, the deposit's outflows SHALL
    /// sum to its single inflow and the treasury grand total SHALL not change.
    #[test]
    fn prop_deposit_outflows_equal_inflow(
        cash in amount(),
        deposit_cash in any::<bool>(),
        checks in prop::collection::vec(amount(), 0..6),
    ) {
        prop_assume!(deposit_cash || !checks.is_empty());

        let (outflow, inflow, grand_before, grand_after, bank) = block_on(async {
            let fx = Fixture::new().await;
            fx.record(AccountRef::Cash(fx.cash.id), Direction::Inflow, cash).await;
            let mut check_ids = Vec::new();
            for amount in &checks {
                check_ids.push(fx.receive_check(*amount).await);
            }
            let grand_before = fx.registry().get_treasury_position(&fx.ctx).await.unwrap().totals[0].grand_total;

            let mut input = fx.deposit_input(check_ids);
            if deposit_cash {
                input.cash_amount = cash;
            }
            let result = fx.composer().create_cash_deposit(&fx.ctx, input).await.unwrap();

            let grand_after = fx.registry().get_treasury_position(&fx.ctx).await.unwrap().totals[0].grand_total;
            (
                result.outflows.iter().map(Movement::signed_amount).sum::<Decimal>(),
                result.inflow.signed_amount(),
                grand_before,
                grand_after,
                fx.bank_balance().await,
            )
        });

        prop_assert_eq!(-outflow, inflow);
        prop_assert_eq!(bank, inflow);
        prop_assert_eq!(grand_before, grand_after);
    }
}
