//! Shared fixture for service tests.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use treasury_shared::ReconciliationConfig;
use treasury_shared::types::{ActorId, CheckId, CompanyId};

use crate::composer::types::{CashClosingInput, CashDepositInput, ClientPaymentInput, CheckLegInput};
use crate::composer::ComposerService;
use crate::context::OperationContext;
use crate::ledger::types::{
    AccountRef, Direction, DocumentRef, Movement, PaymentMedium, RecordMovementInput,
};
use crate::ledger::LedgerService;
use crate::reconciliation::ReconciliationService;
use crate::registry::types::{
    BankAccount, CashAccount, Check, OpenBankAccountInput, OpenCashAccountInput,
};
use crate::registry::RegistryService;
use crate::reversal::ReversalService;
use crate::store::{MemoryStore, TreasuryStore, TreasuryTx};
use crate::suspense::SuspenseService;

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A company with one USD drawer and one USD bank account.
pub(crate) struct Fixture {
    pub store: Arc<MemoryStore>,
    pub ctx: OperationContext,
    pub cash: CashAccount,
    pub bank: BankAccount,
    pub config: ReconciliationConfig,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let ctx = OperationContext::new(CompanyId::new(), ActorId::new());
        let registry = RegistryService::new(Arc::clone(&store));
        let cash = registry
            .open_cash_account(
                &ctx,
                OpenCashAccountInput {
                    name: "Front desk".to_string(),
                    currency: "USD".to_string(),
                },
            )
            .await
            .unwrap();
        let bank = registry
            .open_bank_account(
                &ctx,
                OpenBankAccountInput {
                    name: "Operating".to_string(),
                    bank_name: "First Bank".to_string(),
                    account_number: "001-234567".to_string(),
                    currency: "USD".to_string(),
                },
            )
            .await
            .unwrap();
        Self {
            store,
            ctx,
            cash,
            bank,
            config: ReconciliationConfig::default(),
        }
    }

    pub fn ledger(&self) -> LedgerService<MemoryStore> {
        LedgerService::new(Arc::clone(&self.store))
    }

    pub fn registry(&self) -> RegistryService<MemoryStore> {
        RegistryService::new(Arc::clone(&self.store))
    }

    pub fn composer(&self) -> ComposerService<MemoryStore> {
        ComposerService::new(Arc::clone(&self.store))
    }

    pub fn reversal(&self) -> ReversalService<MemoryStore> {
        ReversalService::new(Arc::clone(&self.store))
    }

    pub fn reconciliation(&self) -> ReconciliationService<MemoryStore> {
        ReconciliationService::new(Arc::clone(&self.store), self.config.clone())
    }

    pub fn suspense(&self) -> SuspenseService<MemoryStore> {
        SuspenseService::new(Arc::clone(&self.store), self.config.clone())
    }

    pub fn input(&self, target: AccountRef, direction: Direction, amount: Decimal) -> RecordMovementInput {
        let medium = match target {
            AccountRef::Cash(_) => PaymentMedium::Cash,
            AccountRef::Bank(_) => PaymentMedium::Transfer,
            AccountRef::Check(_) => PaymentMedium::ThirdPartyCheck,
        };
        RecordMovementInput::new(target, direction, medium, amount, "USD", date(2024, 3, 10))
    }

    pub async fn record(&self, target: AccountRef, direction: Direction, amount: Decimal) -> Movement {
        self.ledger()
            .record_movement(&self.ctx, self.input(target, direction, amount))
            .await
            .unwrap()
    }

    pub async fn open_drawer(&self, name: &str) -> CashAccount {
        self.registry()
            .open_cash_account(
                &self.ctx,
                OpenCashAccountInput {
                    name: name.to_string(),
                    currency: "USD".to_string(),
                },
            )
            .await
            .unwrap()
    }

    pub fn payment_input(&self, document_id: &str, total: Decimal) -> ClientPaymentInput {
        ClientPaymentInput {
            document: DocumentRef::new("PAYMENT", document_id),
            date: date(2024, 3, 10),
            currency: "USD".to_string(),
            total,
            cash_amount: Decimal::ZERO,
            cash_account_id: Some(self.cash.id),
            transfer_amount: Decimal::ZERO,
            bank_account_id: None,
            checks: vec![],
            check_custody_account_id: Some(self.cash.id),
            description: "Client payment".to_string(),
        }
    }

    /// Takes one check into custody of the fixture drawer.
    pub async fn receive_check(&self, amount: Decimal) -> CheckId {
        let mut input = self.payment_input(&format!("CHK-{}", CheckId::new()), amount);
        input.checks = vec![CheckLegInput {
            number: "000123".to_string(),
            bank_name: "Second Bank".to_string(),
            issuer: "ACME Corp".to_string(),
            amount,
            due_date: None,
        }];
        let result = self
            .composer()
            .create_client_payment_movements(&self.ctx, input)
            .await
            .unwrap();
        result.check_ids[0]
    }

    pub fn deposit_input(&self, check_ids: Vec<CheckId>) -> CashDepositInput {
        CashDepositInput {
            document: DocumentRef::new("CASH_DEPOSIT", format!("DEP-{}", CheckId::new())),
            date: date(2024, 3, 11),
            cash_account_id: self.cash.id,
            bank_account_id: self.bank.id,
            cash_amount: Decimal::ZERO,
            check_ids,
            description: "Deposit".to_string(),
        }
    }

    pub async fn deposit_checks(&self, check_ids: Vec<CheckId>) {
        self.composer()
            .create_cash_deposit(&self.ctx, self.deposit_input(check_ids))
            .await
            .unwrap();
    }

    pub fn closing_input(&self, counted: Decimal) -> CashClosingInput {
        CashClosingInput {
            cash_account_id: self.cash.id,
            date: date(2024, 3, 31),
            counted,
        }
    }

    pub async fn cash_account(&self) -> CashAccount {
        self.registry().cash_account(&self.ctx, self.cash.id).await.unwrap()
    }

    pub async fn cash_balance(&self) -> Decimal {
        self.cash_account().await.balance
    }

    pub async fn bank_balance(&self) -> Decimal {
        self.registry()
            .bank_account(&self.ctx, self.bank.id)
            .await
            .unwrap()
            .balance
    }

    pub async fn check(&self, id: CheckId) -> Check {
        self.registry().check(&self.ctx, id).await.unwrap()
    }

    pub async fn movement(&self, id: treasury_shared::types::MovementId) -> Movement {
        self.ledger().movement(&self.ctx, id).await.unwrap()
    }

    pub async fn all_movements(&self) -> Vec<Movement> {
        let mut tx = self.store.begin().await.unwrap();
        tx.movements_for_company(self.ctx.company_id).await.unwrap()
    }
}
