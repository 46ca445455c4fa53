//! One handle over every treasury service sharing a store.

use std::sync::Arc;

use treasury_shared::ReconciliationConfig;

use crate::composer::ComposerService;
use crate::ledger::LedgerService;
use crate::reconciliation::ReconciliationService;
use crate::registry::RegistryService;
use crate::reversal::ReversalService;
use crate::store::TreasuryStore;
use crate::suspense::SuspenseService;

/// The treasury services wired to one store.
pub struct TreasuryEngine<S: TreasuryStore> {
    /// Accounts, checks, position and integrity.
    pub registry: RegistryService<S>,
    /// Single movements and pending confirmation.
    pub ledger: LedgerService<S>,
    /// Payments, deposits and cash closings.
    pub composer: ComposerService<S>,
    /// Reversals.
    pub reversal: ReversalService<S>,
    /// Statement import and matching.
    pub reconciliation: ReconciliationService<S>,
    /// Suspense marking and sweeps.
    pub suspense: SuspenseService<S>,
}

impl<S: TreasuryStore> TreasuryEngine<S> {
    /// Builds every service over `store`.
    #[must_use]
    pub fn new(store: Arc<S>, config: &ReconciliationConfig) -> Self {
        Self {
            registry: RegistryService::new(Arc::clone(&store)),
            ledger: LedgerService::new(Arc::clone(&store)),
            composer: ComposerService::new(Arc::clone(&store)),
            reversal: ReversalService::new(Arc::clone(&store)),
            reconciliation: ReconciliationService::new(Arc::clone(&store), config.clone()),
            suspense: SuspenseService::new(store, config.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OperationContext;
    use crate::ledger::types::{AccountRef, Direction, DocumentRef};
    use crate::registry::types::OpenCashAccountInput;
    use crate::store::MemoryStore;
    use crate::testing::date;
    use rust_decimal_macros::dec;
    use treasury_shared::types::{ActorId, CompanyId};

    #[tokio::test]
    async fn test_services_share_one_store() {
        let engine = TreasuryEngine::new(
            Arc::new(MemoryStore::new()),
            &ReconciliationConfig::default(),
        );
        let ctx = OperationContext::new(CompanyId::new(), ActorId::new());
        let drawer = engine
            .registry
            .open_cash_account(
                &ctx,
                OpenCashAccountInput {
                    name: "Till".to_string(),
                    currency: "usd".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(drawer.currency, "USD");

        let payment = crate::composer::ClientPaymentInput {
            document: DocumentRef::new("PAYMENT", "P-1"),
            date: date(2024, 3, 10),
            currency: "USD".to_string(),
            total: dec!(75),
            cash_amount: dec!(75),
            cash_account_id: Some(drawer.id),
            transfer_amount: dec!(0),
            bank_account_id: None,
            checks: vec![],
            check_custody_account_id: None,
            description: "Counter sale".to_string(),
        };
        engine
            .composer
            .create_client_payment_movements(&ctx, payment)
            .await
            .unwrap();

        let position = engine.registry.get_treasury_position(&ctx).await.unwrap();
        assert_eq!(position.totals[0].grand_total, dec!(75));

        let movements = engine
            .ledger
            .movements_for_document(&ctx, &DocumentRef::new("PAYMENT", "P-1"))
            .await
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].target, AccountRef::Cash(drawer.id));
        assert_eq!(movements[0].direction, Direction::Inflow);
    }
}
