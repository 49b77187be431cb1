//! The debt ledger: the validated starting state of a simulation run.
//!
//! A [`DebtLedger`] is built from caller-supplied [`DebtAccount`]s. Construction
//! rejects negative or out-of-range amounts and APRs as well as duplicate ids,
//! and resolves every missing minimum payment through a [`MinimumPaymentPolicy`],
//! so everything downstream works on [`Debt`]s whose minimum is always known.

use std::collections::HashSet;

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// Highest APR a ledger accepts, as a percentage.
pub const MAX_APR: Decimal = dec!(1000);

/// Largest balance or minimum payment a ledger accepts.
pub const MAX_AMOUNT: Decimal = dec!(1_000_000_000_000_000);

/// A debt as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtAccount {
    pub id: String,
    pub name: String,
    /// Outstanding principal.
    pub balance: Decimal,
    /// Annual percentage rate as a percentage (18.5 means 18.5% per year).
    pub apr: Decimal,
    /// Contractual minimum; derived from the ledger policy when absent.
    #[serde(default)]
    pub minimum_payment: Option<Decimal>,
}

/// A ledger entry with its minimum payment resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: String,
    pub name: String,
    pub balance: Decimal,
    pub apr: Decimal,
    pub minimum_payment: Decimal,
}

impl Debt {
    /// Periodic rate for one month: `apr / 100 / 12`.
    pub fn monthly_rate(&self) -> Decimal {
        monthly_rate(self.apr)
    }

    /// Interest one month at the current balance would accrue.
    pub fn monthly_interest(&self) -> Decimal {
        self.balance * self.monthly_rate()
    }

    pub fn is_open(&self) -> bool {
        self.balance > Decimal::ZERO
    }
}

/// Converts an annual percentage rate into the monthly periodic rate.
pub fn monthly_rate(apr: Decimal) -> Decimal {
    apr / dec!(100) / dec!(12)
}

/// Annual rate actually paid when `apr` compounds monthly, as a percentage.
///
/// 12% nominal compounds to roughly 12.68% per year.
pub fn effective_annual_rate(apr: Decimal) -> Decimal {
    let growth = (Decimal::ONE + monthly_rate(apr)).powu(12);
    (growth - Decimal::ONE) * dec!(100)
}

/// How a missing minimum payment is derived: `max(balance * percent / 100, floor)`,
/// raised above the first month's interest and never more than the balance itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimumPaymentPolicy {
    pub percent_of_balance: Decimal,
    pub floor: Decimal,
}

const INTEREST_FLOOR_MARGIN: Decimal = dec!(0.01);

impl Default for MinimumPaymentPolicy {
    fn default() -> Self {
        Self {
            percent_of_balance: dec!(2),
            floor: dec!(50),
        }
    }
}

impl MinimumPaymentPolicy {
    /// A debt paying only this amount never grows: the minimum beats the
    /// opening month's interest by a cent, and interest only shrinks from there.
    pub fn minimum_for(&self, balance: Decimal, apr: Decimal) -> Decimal {
        let proportional = balance * self.percent_of_balance / dec!(100);
        let interest_floor = balance * monthly_rate(apr) + INTEREST_FLOOR_MARGIN;
        proportional
            .max(self.floor)
            .max(interest_floor)
            .min(balance)
    }
}

/// Per-debt line of a [`DebtSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtSummaryItem {
    pub id: String,
    pub name: String,
    pub balance: Decimal,
    pub apr: Decimal,
    pub minimum_payment: Decimal,
    pub monthly_interest: Decimal,
    pub effective_annual_rate: Decimal,
}

/// Aggregate view of a ledger used by the planning screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtSummary {
    pub total_debt: Decimal,
    pub monthly_minimums: Decimal,
    pub weighted_apr: Decimal,
    pub debt_count: usize,
    pub available_budget: Decimal,
    pub debts: Vec<DebtSummaryItem>,
}

/// Result of checking a budget against the ledger's minimums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetValidation {
    pub is_valid: bool,
    pub monthly_budget: Decimal,
    pub minimum_required: Decimal,
    pub excess_budget: Decimal,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DebtLedger {
    debts: Vec<Debt>,
}

impl DebtLedger {
    /// Validates caller accounts and resolves missing minimums with `policy`.
    pub fn new(accounts: Vec<DebtAccount>, policy: &MinimumPaymentPolicy) -> Result<Self> {
        let debts = accounts
            .into_iter()
            .map(|account| {
                let minimum_payment = match account.minimum_payment {
                    Some(minimum) => minimum,
                    None => policy.minimum_for(account.balance.max(Decimal::ZERO), account.apr),
                };
                Debt {
                    id: account.id,
                    name: account.name,
                    balance: account.balance,
                    apr: account.apr,
                    minimum_payment,
                }
            })
            .collect();
        Self::from_debts(debts)
    }

    /// Builds a ledger from already-resolved debts, applying the same validation.
    pub fn from_debts(debts: Vec<Debt>) -> Result<Self> {
        let mut seen = HashSet::new();
        for debt in &debts {
            if debt.balance < Decimal::ZERO {
                return Err(PlanError::MalformedLedger(format!(
                    "Negative balance for '{}'.",
                    debt.name
                )));
            }
            if debt.balance > MAX_AMOUNT {
                return Err(PlanError::MalformedLedger(format!(
                    "Balance for '{}' exceeds {MAX_AMOUNT}.",
                    debt.name
                )));
            }
            if debt.apr < Decimal::ZERO || debt.apr > MAX_APR {
                return Err(PlanError::MalformedLedger(format!(
                    "Invalid APR for '{}': must be between 0 and {MAX_APR}.",
                    debt.name
                )));
            }
            if debt.minimum_payment < Decimal::ZERO {
                return Err(PlanError::MalformedLedger(format!(
                    "Negative minimum payment for '{}'.",
                    debt.name
                )));
            }
            if debt.minimum_payment > MAX_AMOUNT {
                return Err(PlanError::MalformedLedger(format!(
                    "Minimum payment for '{}' exceeds {MAX_AMOUNT}.",
                    debt.name
                )));
            }
            if !seen.insert(debt.id.as_str()) {
                return Err(PlanError::MalformedLedger(format!(
                    "Duplicate debt id '{}'.",
                    debt.id
                )));
            }
        }
        Ok(Self { debts })
    }

    pub fn debts(&self) -> &[Debt] {
        &self.debts
    }

    pub fn len(&self) -> usize {
        self.debts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.debts.is_empty()
    }

    pub fn total_balance(&self) -> Decimal {
        self.debts.iter().map(|d| d.balance).sum()
    }

    /// Sum of minimums over debts that still carry a balance.
    pub fn total_minimum_payments(&self) -> Decimal {
        self.debts
            .iter()
            .filter(|d| d.is_open())
            .map(|d| d.minimum_payment)
            .sum()
    }

    /// Balance-weighted APR; zero for a ledger with nothing outstanding.
    pub fn weighted_average_apr(&self) -> Decimal {
        let total = self.total_balance();
        if total.is_zero() {
            return Decimal::ZERO;
        }
        let weighted: Decimal = self.debts.iter().map(|d| d.apr * d.balance).sum();
        weighted / total
    }

    /// Fails with [`PlanError::InsufficientBudget`] when `monthly_budget` does not
    /// cover the minimums.
    pub fn ensure_budget(&self, monthly_budget: Decimal) -> Result<()> {
        let required = self.total_minimum_payments();
        if monthly_budget < required || monthly_budget < Decimal::ZERO {
            return Err(PlanError::InsufficientBudget {
                budget: monthly_budget,
                required,
            });
        }
        Ok(())
    }

    pub fn validate_budget(&self, monthly_budget: Decimal) -> BudgetValidation {
        let minimum_required = self.total_minimum_payments();
        let is_valid = monthly_budget >= minimum_required;
        let (excess_budget, message) = if is_valid {
            (
                monthly_budget - minimum_required,
                "Budget covers minimums".to_string(),
            )
        } else {
            (
                Decimal::ZERO,
                format!(
                    "Budget is {} short",
                    (minimum_required - monthly_budget).round_dp(2)
                ),
            )
        };
        BudgetValidation {
            is_valid,
            monthly_budget,
            minimum_required: minimum_required.round_dp(2),
            excess_budget: excess_budget.round_dp(2),
            message,
        }
    }

    pub fn summary(&self, available_budget: Decimal) -> DebtSummary {
        let debts = self
            .debts
            .iter()
            .map(|d| DebtSummaryItem {
                id: d.id.clone(),
                name: d.name.clone(),
                balance: d.balance.round_dp(2),
                apr: d.apr,
                minimum_payment: d.minimum_payment.round_dp(2),
                monthly_interest: d.monthly_interest().round_dp(2),
                effective_annual_rate: effective_annual_rate(d.apr).round_dp(2),
            })
            .collect();

        DebtSummary {
            total_debt: self.total_balance().round_dp(2),
            monthly_minimums: self.total_minimum_payments().round_dp(2),
            weighted_apr: self.weighted_average_apr().round_dp(2),
            debt_count: self.debts.len(),
            available_budget,
            debts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn account(id: &str, balance: Decimal, apr: Decimal, minimum: Option<Decimal>) -> DebtAccount {
        DebtAccount {
            id: id.to_string(),
            name: id.to_uppercase(),
            balance,
            apr,
            minimum_payment: minimum,
        }
    }

    fn sample_ledger() -> DebtLedger {
        DebtLedger::new(
            vec![
                account("cc", dec!(100000), dec!(36), Some(dec!(3000))),
                account("loan", dec!(200000), dec!(12), Some(dec!(5000))),
            ],
            &MinimumPaymentPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_totals() {
        let ledger = sample_ledger();
        assert_eq!(ledger.total_balance(), dec!(300000));
        assert_eq!(ledger.total_minimum_payments(), dec!(8000));
        // (36 * 100000 + 12 * 200000) / 300000
        assert_eq!(ledger.weighted_average_apr(), dec!(20));
    }

    #[test]
    fn test_weighted_apr_of_empty_ledger_is_zero() {
        let ledger = DebtLedger::default();
        assert_eq!(ledger.weighted_average_apr(), Decimal::ZERO);
        assert_eq!(ledger.total_minimum_payments(), Decimal::ZERO);
    }

    #[test]
    fn test_paid_off_debt_excluded_from_minimums() {
        let ledger = DebtLedger::new(
            vec![
                account("a", dec!(0), dec!(10), Some(dec!(100))),
                account("b", dec!(1000), dec!(10), Some(dec!(40))),
            ],
            &MinimumPaymentPolicy::default(),
        )
        .unwrap();
        assert_eq!(ledger.total_minimum_payments(), dec!(40));
    }

    #[rstest]
    #[case(dec!(100000), dec!(12), dec!(2000))]
    #[case(dec!(1000), dec!(12), dec!(50))]
    #[case(dec!(30), dec!(12), dec!(30))]
    #[case(dec!(0), dec!(12), dec!(0))]
    // 3% a month outgrows the 2% share, so the interest floor wins
    #[case(dec!(100000), dec!(36), dec!(3000.01))]
    #[case(dec!(10000), dec!(60), dec!(500.01))]
    fn test_default_minimum_policy(
        #[case] balance: Decimal,
        #[case] apr: Decimal,
        #[case] expected: Decimal,
    ) {
        let policy = MinimumPaymentPolicy::default();
        assert_eq!(policy.minimum_for(balance, apr), expected);
    }

    #[test]
    fn test_default_minimum_covers_interest() {
        let policy = MinimumPaymentPolicy::default();
        for apr in [dec!(0), dec!(18), dec!(24), dec!(36), dec!(99.9), MAX_APR] {
            let balance = dec!(250000);
            assert!(policy.minimum_for(balance, apr) > balance * monthly_rate(apr));
        }
    }

    #[test]
    fn test_missing_minimum_is_resolved() {
        let ledger = DebtLedger::new(
            vec![account("cc", dec!(10000), dec!(18), None)],
            &MinimumPaymentPolicy::default(),
        )
        .unwrap();
        assert_eq!(ledger.debts()[0].minimum_payment, dec!(200));
    }

    #[rstest]
    #[case(account("a", dec!(-1), dec!(10), None))]
    #[case(account("a", dec!(100), dec!(-0.5), None))]
    #[case(account("a", dec!(100), dec!(10), Some(dec!(-5))))]
    #[case(account("a", dec!(1000), dec!(100000), Some(dec!(0))))]
    #[case(account("a", MAX_AMOUNT + dec!(0.01), dec!(10), None))]
    #[case(account("a", dec!(100), dec!(10), Some(MAX_AMOUNT * dec!(10))))]
    fn test_malformed_accounts_rejected(#[case] bad: DebtAccount) {
        let result = DebtLedger::new(vec![bad], &MinimumPaymentPolicy::default());
        assert!(matches!(result, Err(PlanError::MalformedLedger(_))));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = DebtLedger::new(
            vec![
                account("a", dec!(100), dec!(10), None),
                account("a", dec!(200), dec!(12), None),
            ],
            &MinimumPaymentPolicy::default(),
        );
        assert!(matches!(result, Err(PlanError::MalformedLedger(_))));
    }

    #[test]
    fn test_ensure_budget() {
        let ledger = sample_ledger();
        assert!(ledger.ensure_budget(dec!(8000)).is_ok());
        let err = ledger.ensure_budget(dec!(7999.99)).unwrap_err();
        assert!(matches!(
            err,
            PlanError::InsufficientBudget { required, .. } if required == dec!(8000)
        ));
    }

    #[test]
    fn test_validate_budget() {
        let ledger = sample_ledger();

        let ok = ledger.validate_budget(dec!(10000));
        assert!(ok.is_valid);
        assert_eq!(ok.excess_budget, dec!(2000));

        let short = ledger.validate_budget(dec!(7500));
        assert!(!short.is_valid);
        assert_eq!(short.excess_budget, Decimal::ZERO);
        assert_eq!(short.message, "Budget is 500 short");
    }

    #[test]
    fn test_summary() {
        let summary = sample_ledger().summary(dec!(15000));
        assert_eq!(summary.debt_count, 2);
        assert_eq!(summary.total_debt, dec!(300000));
        assert_eq!(summary.monthly_minimums, dec!(8000));
        assert_eq!(summary.available_budget, dec!(15000));
        assert_eq!(summary.debts[0].monthly_interest, dec!(3000));
        assert_eq!(summary.debts[1].monthly_interest, dec!(2000));
    }

    #[test]
    fn test_effective_annual_rate() {
        // (1.01)^12 - 1 = 12.6825...%
        let ear = effective_annual_rate(dec!(12));
        assert!(ear > dec!(12.68) && ear < dec!(12.69));
        assert_eq!(effective_annual_rate(Decimal::ZERO), Decimal::ZERO);
    }
}
