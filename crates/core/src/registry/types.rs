//! Account registry types: cash drawers, bank accounts and checks.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use treasury_shared::types::{BankAccountId, CashAccountId, CheckId, CompanyId};

use crate::ledger::types::{AccountRef, Movement};

/// A cash drawer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashAccount {
    /// Account ID.
    pub id: CashAccountId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Display name.
    pub name: String,
    /// ISO currency code.
    pub currency: String,
    /// Cash on hand.
    pub balance: Decimal,
    /// Value of the checks held in custody.
    pub portfolio_balance: Decimal,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl CashAccount {
    /// Cash plus check portfolio.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.balance + self.portfolio_balance
    }
}

/// A bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Account ID.
    pub id: BankAccountId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Display name.
    pub name: String,
    /// Bank name.
    pub bank_name: String,
    /// Account number at the bank.
    pub account_number: String,
    /// ISO currency code.
    pub currency: String,
    /// Book balance.
    pub balance: Decimal,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

string_enum! {
    /// Custody state of a check.
    pub enum CheckState {
        /// Held by a cash drawer.
        Custody => "CUSTODY",
        /// Handed to the bank, not yet settled.
        Deposited => "DEPOSITED",
        /// Settled by the bank.
        Cleared => "CLEARED",
        /// Bounced by the bank.
        Rejected => "REJECTED",
        /// Given back after the payment that brought it in was reversed.
        Returned => "RETURNED",
    }
}

/// A check held by the company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    /// Check ID.
    pub id: CheckId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Check number.
    pub number: String,
    /// Issuing bank.
    pub bank_name: String,
    /// Who signed the check.
    pub issuer: String,
    /// Face value.
    pub amount: Decimal,
    /// ISO currency code.
    pub currency: String,
    /// Date the check can be cashed.
    pub due_date: Option<NaiveDate>,
    /// Custody state.
    pub state: CheckState,
    /// Cash drawer whose portfolio holds the check.
    pub custody_account_id: CashAccountId,
    /// Bank account the check was deposited into.
    pub deposited_into: Option<BankAccountId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// The materialized balance a delta is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceTarget {
    /// Cash on hand of a drawer.
    CashDrawer(CashAccountId),
    /// Check portfolio of a drawer.
    Portfolio(CashAccountId),
    /// Bank account balance.
    Bank(BankAccountId),
}

impl std::fmt::Display for BalanceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CashDrawer(id) => write!(f, "cash drawer {id}"),
            Self::Portfolio(id) => write!(f, "check portfolio of {id}"),
            Self::Bank(id) => write!(f, "bank account {id}"),
        }
    }
}

/// Input for opening a cash drawer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenCashAccountInput {
    /// Display name.
    pub name: String,
    /// ISO currency code.
    pub currency: String,
}

/// Input for opening a bank account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenBankAccountInput {
    /// Display name.
    pub name: String,
    /// Bank name.
    pub bank_name: String,
    /// Account number at the bank.
    pub account_number: String,
    /// ISO currency code.
    pub currency: String,
}

/// One cash drawer in a treasury position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CashPosition {
    /// Account ID.
    pub id: CashAccountId,
    /// Display name.
    pub name: String,
    /// ISO currency code.
    pub currency: String,
    /// Cash on hand.
    pub cash_balance: Decimal,
    /// Check portfolio value.
    pub portfolio_balance: Decimal,
    /// Cash plus portfolio.
    pub total: Decimal,
}

/// One bank account in a treasury position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankPosition {
    /// Account ID.
    pub id: BankAccountId,
    /// Display name.
    pub name: String,
    /// ISO currency code.
    pub currency: String,
    /// Book balance.
    pub balance: Decimal,
}

/// Totals for one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyTotals {
    /// ISO currency code.
    pub currency: String,
    /// Sum of drawer cash.
    pub cash: Decimal,
    /// Sum of bank balances.
    pub bank: Decimal,
    /// Sum of check portfolios.
    pub check_portfolio: Decimal,
    /// Everything above.
    pub grand_total: Decimal,
}

impl CurrencyTotals {
    fn zero(currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            cash: Decimal::ZERO,
            bank: Decimal::ZERO,
            check_portfolio: Decimal::ZERO,
            grand_total: Decimal::ZERO,
        }
    }
}

/// Read-only snapshot of a company's treasury.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreasuryPosition {
    /// Company.
    pub company_id: CompanyId,
    /// Cash drawers.
    pub cash_accounts: Vec<CashPosition>,
    /// Bank accounts.
    pub bank_accounts: Vec<BankPosition>,
    /// Totals per currency, ordered by currency code.
    pub totals: Vec<CurrencyTotals>,
}

impl TreasuryPosition {
    /// Aggregates account balances into a position.
    #[must_use]
    pub fn from_accounts(
        company_id: CompanyId,
        cash_accounts: &[CashAccount],
        bank_accounts: &[BankAccount],
    ) -> Self {
        let mut totals: BTreeMap<String, CurrencyTotals> = BTreeMap::new();
        for account in cash_accounts {
            let t = totals
                .entry(account.currency.clone())
                .or_insert_with(|| CurrencyTotals::zero(&account.currency));
            t.cash += account.balance;
            t.check_portfolio += account.portfolio_balance;
            t.grand_total += account.total();
        }
        for account in bank_accounts {
            let t = totals
                .entry(account.currency.clone())
                .or_insert_with(|| CurrencyTotals::zero(&account.currency));
            t.bank += account.balance;
            t.grand_total += account.balance;
        }

        Self {
            company_id,
            cash_accounts: cash_accounts
                .iter()
                .map(|a| CashPosition {
                    id: a.id,
                    name: a.name.clone(),
                    currency: a.currency.clone(),
                    cash_balance: a.balance,
                    portfolio_balance: a.portfolio_balance,
                    total: a.total(),
                })
                .collect(),
            bank_accounts: bank_accounts
                .iter()
                .map(|a| BankPosition {
                    id: a.id,
                    name: a.name.clone(),
                    currency: a.currency.clone(),
                    balance: a.balance,
                })
                .collect(),
            totals: totals.into_values().collect(),
        }
    }
}

/// An account whose materialized balance disagrees with its movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceDrift {
    /// The drifted balance.
    pub target: BalanceTarget,
    /// Balance stored on the account.
    pub recorded: Decimal,
    /// Signed sum of the balance-applied movements.
    pub computed: Decimal,
}

/// Result of an integrity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Company.
    pub company_id: CompanyId,
    /// Number of balances compared.
    pub checked: usize,
    /// Balances that drifted.
    pub drifts: Vec<BalanceDrift>,
}

impl IntegrityReport {
    /// Returns true if every balance matches its movements.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.drifts.is_empty()
    }

    /// Recomputes every balance from movements and compares it to the stored one.
    ///
    /// Only CONFIRMED and REVERSED movements count; a reversed movement and
    /// its reversal cancel out. Check movements count toward the portfolio of
    /// the drawer holding the check.
    #[must_use]
    pub fn compute(
        company_id: CompanyId,
        cash_accounts: &[CashAccount],
        bank_accounts: &[BankAccount],
        checks: &[Check],
        movements: &[Movement],
    ) -> Self {
        let holders: HashMap<CheckId, CashAccountId> = checks
            .iter()
            .map(|c| (c.id, c.custody_account_id))
            .collect();

        let mut computed: BTreeMap<BalanceTarget, Decimal> = BTreeMap::new();
        for movement in movements.iter().filter(|m| m.state.applies_balance()) {
            let target = match movement.target {
                AccountRef::Cash(id) => BalanceTarget::CashDrawer(id),
                AccountRef::Bank(id) => BalanceTarget::Bank(id),
                AccountRef::Check(id) => match holders.get(&id) {
                    Some(holder) => BalanceTarget::Portfolio(*holder),
                    None => continue,
                },
            };
            *computed.entry(target).or_insert(Decimal::ZERO) += movement.signed_amount();
        }

        let mut recorded: Vec<(BalanceTarget, Decimal)> = Vec::new();
        for account in cash_accounts {
            recorded.push((BalanceTarget::CashDrawer(account.id), account.balance));
            recorded.push((BalanceTarget::Portfolio(account.id), account.portfolio_balance));
        }
        for account in bank_accounts {
            recorded.push((BalanceTarget::Bank(account.id), account.balance));
        }

        let drifts = recorded
            .iter()
            .filter_map(|(target, balance)| {
                let sum = computed.get(target).copied().unwrap_or(Decimal::ZERO);
                (sum != *balance).then_some(BalanceDrift {
                    target: *target,
                    recorded: *balance,
                    computed: sum,
                })
            })
            .collect();

        Self {
            company_id,
            checked: recorded.len(),
            drifts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{Direction, MovementState, PaymentMedium};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use treasury_shared::types::{ActorId, MovementId};

    fn drawer(company: CompanyId, currency: &str, cash: Decimal, portfolio: Decimal) -> CashAccount {
        CashAccount {
            id: CashAccountId::new(),
            company_id: company,
            name: "Main drawer".to_string(),
            currency: currency.to_string(),
            balance: cash,
            portfolio_balance: portfolio,
            created_at: Utc::now(),
        }
    }

    fn bank(company: CompanyId, currency: &str, balance: Decimal) -> BankAccount {
        BankAccount {
            id: BankAccountId::new(),
            company_id: company,
            name: "Operating".to_string(),
            bank_name: "First Bank".to_string(),
            account_number: "001-234".to_string(),
            currency: currency.to_string(),
            balance,
            created_at: Utc::now(),
        }
    }

    fn movement(
        company: CompanyId,
        target: AccountRef,
        direction: Direction,
        amount: Decimal,
        state: MovementState,
    ) -> Movement {
        Movement {
            id: MovementId::new(),
            company_id: company,
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            value_date: None,
            direction,
            medium: PaymentMedium::Cash,
            amount,
            currency: "USD".to_string(),
            target,
            description: String::new(),
            document: None,
            state,
            reversal_of_id: None,
            reversed_by_id: None,
            reconciled_item_id: None,
            created_by: ActorId::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_position_totals_per_currency() {
        let company = CompanyId::new();
        let cash = vec![
            drawer(company, "USD", dec!(100), dec!(400)),
            drawer(company, "EUR", dec!(50), dec!(0)),
        ];
        let banks = vec![bank(company, "USD", dec!(1000)), bank(company, "USD", dec!(25.50))];

        let position = TreasuryPosition::from_accounts(company, &cash, &banks);

        assert_eq!(position.cash_accounts.len(), 2);
        assert_eq!(position.cash_accounts[0].total, dec!(500));
        assert_eq!(position.totals.len(), 2);

        let eur = &position.totals[0];
        assert_eq!(eur.currency, "EUR");
        assert_eq!(eur.grand_total, dec!(50));

        let usd = &position.totals[1];
        assert_eq!(usd.cash, dec!(100));
        assert_eq!(usd.check_portfolio, dec!(400));
        assert_eq!(usd.bank, dec!(1025.50));
        assert_eq!(usd.grand_total, dec!(1525.50));
    }

    #[test]
    fn test_integrity_ignores_pending_and_cancels_reversals() {
        let company = CompanyId::new();
        let account = drawer(company, "USD", dec!(70), dec!(0));
        let target = AccountRef::Cash(account.id);
        let movements = vec![
            movement(company, target, Direction::Inflow, dec!(100), MovementState::Confirmed),
            movement(company, target, Direction::Outflow, dec!(30), MovementState::Confirmed),
            movement(company, target, Direction::Inflow, dec!(999), MovementState::Pending),
            movement(company, target, Direction::Inflow, dec!(40), MovementState::Reversed),
            movement(company, target, Direction::Outflow, dec!(40), MovementState::Confirmed),
        ];

        let report = IntegrityReport::compute(company, &[account], &[], &[], &movements);

        assert!(report.is_consistent());
        assert_eq!(report.checked, 2);
    }

    #[test]
    fn test_integrity_reports_drift() {
        let company = CompanyId::new();
        let account = bank(company, "USD", dec!(500));
        let movements = vec![movement(
            company,
            AccountRef::Bank(account.id),
            Direction::Inflow,
            dec!(450),
            MovementState::Confirmed,
        )];

        let report = IntegrityReport::compute(company, &[], &[account.clone()], &[], &movements);

        assert_eq!(
            report.drifts,
            vec![BalanceDrift {
                target: BalanceTarget::Bank(account.id),
                recorded: dec!(500),
                computed: dec!(450),
            }]
        );
    }

    #[test]
    fn test_integrity_routes_check_movements_to_holder_portfolio() {
        let company = CompanyId::new();
        let account = drawer(company, "USD", dec!(0), dec!(400));
        let check = Check {
            id: CheckId::new(),
            company_id: company,
            number: "000123".to_string(),
            bank_name: "First Bank".to_string(),
            issuer: "ACME".to_string(),
            amount: dec!(400),
            currency: "USD".to_string(),
            due_date: None,
            state: CheckState::Custody,
            custody_account_id: account.id,
            deposited_into: None,
            created_at: Utc::now(),
        };
        let movements = vec![movement(
            company,
            AccountRef::Check(check.id),
            Direction::Inflow,
            dec!(400),
            MovementState::Confirmed,
        )];

        let report = IntegrityReport::compute(company, &[account], &[], &[check], &movements);

        assert!(report.is_consistent());
    }
}
