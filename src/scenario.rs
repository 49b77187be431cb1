//! What-if analysis: run a baseline plan and a perturbed plan side by side and
//! describe the difference.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::{Simulation, SimulationParams, Windfall, simulate};
use crate::error::{PlanError, Result};
use crate::ledger::{Debt, DebtLedger, MinimumPaymentPolicy};
use crate::report::{PlanSummary, format_currency};
use crate::strategy::Strategy;

/// Name that selects every debt in `affected_debts`.
pub const ALL_DEBTS: &str = "All";

const CONSOLIDATED_ID: &str = "consolidated";
const CONSOLIDATED_NAME: &str = "Consolidated Loan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    ExtraPayment,
    BudgetReduction,
    InterestRateChange,
    DebtConsolidation,
    Windfall,
}

fn default_analysis_months() -> u32 {
    60
}

fn default_windfall_month() -> u32 {
    1
}

/// Body of a what-if request. Parameters that do not belong to
/// `scenario_type` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatIfRequest {
    pub scenario_type: ScenarioType,
    pub base_budget: Decimal,
    #[serde(default)]
    pub base_strategy: Strategy,
    #[serde(default = "default_analysis_months")]
    pub analysis_months: u32,
    #[serde(default)]
    pub extra_payment: Option<Decimal>,
    #[serde(default)]
    pub budget_reduction: Option<Decimal>,
    /// Percentage points added to each affected APR.
    #[serde(default)]
    pub rate_change_percent: Option<Decimal>,
    /// Debt names or ids; empty or containing "All" means every debt.
    #[serde(default)]
    pub affected_debts: Vec<String>,
    #[serde(default)]
    pub consolidation_rate: Option<Decimal>,
    #[serde(default)]
    pub consolidation_fee: Option<Decimal>,
    #[serde(default)]
    pub windfall_amount: Option<Decimal>,
    #[serde(default = "default_windfall_month")]
    pub windfall_month: u32,
}

impl WhatIfRequest {
    pub fn new(scenario_type: ScenarioType, base_budget: Decimal) -> Self {
        Self {
            scenario_type,
            base_budget,
            base_strategy: Strategy::default(),
            analysis_months: default_analysis_months(),
            extra_payment: None,
            budget_reduction: None,
            rate_change_percent: None,
            affected_debts: Vec::new(),
            consolidation_rate: None,
            consolidation_fee: None,
            windfall_amount: None,
            windfall_month: default_windfall_month(),
        }
    }

    /// Extracts and validates the single perturbation this request describes.
    pub fn perturbation(&self) -> Result<Perturbation> {
        let perturbation = match self.scenario_type {
            ScenarioType::ExtraPayment => {
                Perturbation::ExtraPayment(non_negative("extra_payment", self.extra_payment)?)
            }
            ScenarioType::BudgetReduction => Perturbation::BudgetReduction(non_negative(
                "budget_reduction",
                self.budget_reduction,
            )?),
            ScenarioType::InterestRateChange => Perturbation::InterestRateChange {
                rate_change_percent: self.rate_change_percent.unwrap_or_default(),
                affected: DebtSelection::from_names(&self.affected_debts),
            },
            ScenarioType::DebtConsolidation => Perturbation::DebtConsolidation {
                rate: non_negative("consolidation_rate", self.consolidation_rate)?,
                fee: non_negative("consolidation_fee", self.consolidation_fee)?,
                affected: DebtSelection::from_names(&self.affected_debts),
            },
            ScenarioType::Windfall => {
                if self.windfall_month == 0 || self.windfall_month > self.analysis_months {
                    return Err(PlanError::InvalidScenario(format!(
                        "windfall_month must be between 1 and {}.",
                        self.analysis_months
                    )));
                }
                Perturbation::Windfall(Windfall {
                    amount: non_negative("windfall_amount", self.windfall_amount)?,
                    month: self.windfall_month,
                })
            }
        };
        Ok(perturbation)
    }
}

fn non_negative(field: &str, value: Option<Decimal>) -> Result<Decimal> {
    let value = value.unwrap_or_default();
    if value < Decimal::ZERO {
        return Err(PlanError::InvalidScenario(format!(
            "{field} cannot be negative."
        )));
    }
    Ok(value)
}

/// Which debts a rate change or consolidation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebtSelection {
    All,
    Named(Vec<String>),
}

impl DebtSelection {
    pub fn from_names(names: &[String]) -> Self {
        if names.is_empty() || names.iter().any(|n| n.eq_ignore_ascii_case(ALL_DEBTS)) {
            Self::All
        } else {
            Self::Named(names.to_vec())
        }
    }

    /// One flag per ledger debt. Every name must match a debt's name or id.
    fn resolve(&self, debts: &[Debt]) -> Result<Vec<bool>> {
        match self {
            Self::All => Ok(vec![true; debts.len()]),
            Self::Named(names) => {
                if let Some(unknown) = names
                    .iter()
                    .find(|n| !debts.iter().any(|d| &d.name == *n || &d.id == *n))
                {
                    return Err(PlanError::InvalidScenario(format!(
                        "Unknown debt '{unknown}' in affected_debts."
                    )));
                }
                Ok(debts
                    .iter()
                    .map(|d| names.iter().any(|n| *n == d.name || *n == d.id))
                    .collect())
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::All => "all debts".to_string(),
            Self::Named(names) => names.join(", "),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Perturbation {
    ExtraPayment(Decimal),
    BudgetReduction(Decimal),
    InterestRateChange {
        rate_change_percent: Decimal,
        affected: DebtSelection,
    },
    DebtConsolidation {
        rate: Decimal,
        fee: Decimal,
        affected: DebtSelection,
    },
    Windfall(Windfall),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub scenario_type: ScenarioType,
    pub description: String,
    pub baseline: PlanSummary,
    pub scenario: PlanSummary,
    pub interest_savings: Decimal,
    pub months_saved: i64,
    pub payment_difference: Decimal,
    pub insights: Vec<String>,
}

/// Applies what-if requests to a ledger.
#[derive(Debug, Clone)]
pub struct ScenarioModifier<'a> {
    policy: &'a MinimumPaymentPolicy,
    currency_symbol: &'a str,
}

impl<'a> ScenarioModifier<'a> {
    /// `policy` sets the minimum payment of a consolidated loan; `currency_symbol`
    /// prefixes amounts in insight text.
    pub fn new(policy: &'a MinimumPaymentPolicy, currency_symbol: &'a str) -> Self {
        Self {
            policy,
            currency_symbol,
        }
    }

    /// Runs the baseline and the perturbed plan and compares them.
    ///
    /// # Errors
    ///
    /// The baseline fails exactly like a plan with the same inputs would
    /// (e.g. [`PlanError::InsufficientBudget`]). A perturbation that cannot be
    /// simulated fails with [`PlanError::InvalidScenario`].
    pub fn compare(&self, ledger: &DebtLedger, request: &WhatIfRequest) -> Result<ScenarioComparison> {
        let base_params = SimulationParams::new(
            request.base_budget,
            request.base_strategy,
            request.analysis_months,
        );
        let baseline = simulate(ledger, &base_params)?;

        let perturbation = request.perturbation()?;
        let (scenario_ledger, scenario_params) = self
            .apply(ledger, base_params, &perturbation)
            .map_err(|e| match e {
                PlanError::MalformedLedger(detail) => PlanError::InvalidScenario(detail),
                other => other,
            })?;
        let scenario = simulate(&scenario_ledger, &scenario_params).map_err(|e| match e {
            PlanError::InsufficientBudget { .. } => PlanError::InvalidScenario(e.to_string()),
            other => other,
        })?;

        let comparison = self.assemble(request, &perturbation, &baseline, &scenario);
        info!(
            target: "scenario",
            scenario = ?request.scenario_type,
            months_saved = comparison.months_saved,
            interest_savings = %comparison.interest_savings,
            "What-if analysis complete"
        );
        Ok(comparison)
    }

    fn apply(
        &self,
        ledger: &DebtLedger,
        base: SimulationParams,
        perturbation: &Perturbation,
    ) -> Result<(DebtLedger, SimulationParams)> {
        let mut params = base;
        let scenario_ledger = match perturbation {
            Perturbation::ExtraPayment(amount) => {
                params.monthly_budget = params.monthly_budget.checked_add(*amount).ok_or_else(|| {
                    PlanError::InvalidScenario("Extra payment is too large.".to_string())
                })?;
                ledger.clone()
            }
            Perturbation::BudgetReduction(amount) => {
                params.monthly_budget -= *amount;
                let required = ledger.total_minimum_payments();
                if params.monthly_budget < required {
                    return Err(PlanError::InvalidScenario(format!(
                        "Reduced budget ({}) is below total minimum payments ({}).",
                        params.monthly_budget, required
                    )));
                }
                ledger.clone()
            }
            Perturbation::InterestRateChange {
                rate_change_percent,
                affected,
            } => {
                let selected = affected.resolve(ledger.debts())?;
                let mut debts = ledger.debts().to_vec();
                for (debt, hit) in debts.iter_mut().zip(selected) {
                    if !hit {
                        continue;
                    }
                    debt.apr += *rate_change_percent;
                    if debt.apr < Decimal::ZERO {
                        return Err(PlanError::InvalidScenario(format!(
                            "Rate change leaves '{}' with a negative APR.",
                            debt.name
                        )));
                    }
                }
                DebtLedger::from_debts(debts)?
            }
            Perturbation::DebtConsolidation {
                rate,
                fee,
                affected,
            } => self.consolidate(ledger, *rate, *fee, affected)?,
            Perturbation::Windfall(windfall) => {
                params = params.with_windfall(*windfall);
                ledger.clone()
            }
        };
        Ok((scenario_ledger, params))
    }

    fn consolidate(
        &self,
        ledger: &DebtLedger,
        rate: Decimal,
        fee: Decimal,
        affected: &DebtSelection,
    ) -> Result<DebtLedger> {
        let selected = affected.resolve(ledger.debts())?;
        let Some(position) = selected.iter().position(|&hit| hit) else {
            return Err(PlanError::InvalidScenario(
                "No debts selected for consolidation.".to_string(),
            ));
        };

        let mut kept = Vec::with_capacity(ledger.len());
        let mut combined = Decimal::ZERO;
        for (debt, hit) in ledger.debts().iter().zip(&selected) {
            if *hit {
                combined += debt.balance;
            } else {
                kept.push(debt.clone());
            }
        }

        let mut id = CONSOLIDATED_ID.to_string();
        let mut suffix = 2;
        while kept.iter().any(|d| d.id == id) {
            id = format!("{CONSOLIDATED_ID}-{suffix}");
            suffix += 1;
        }

        let balance = combined + fee;
        let loan = Debt {
            id,
            name: CONSOLIDATED_NAME.to_string(),
            balance,
            apr: rate,
            minimum_payment: self.policy.minimum_for(balance, rate),
        };
        // unselected debts before the first selected one keep their place
        let insert_at = selected[..position].iter().filter(|&&hit| !hit).count();
        kept.insert(insert_at, loan);
        DebtLedger::from_debts(kept)
    }

    fn assemble(
        &self,
        request: &WhatIfRequest,
        perturbation: &Perturbation,
        baseline: &Simulation,
        scenario: &Simulation,
    ) -> ScenarioComparison {
        let baseline = PlanSummary::from_simulation(baseline);
        let scenario = PlanSummary::from_simulation(scenario);

        let interest_savings = baseline.total_interest - scenario.total_interest;
        let months_saved = i64::from(baseline.months) - i64::from(scenario.months);
        let payment_difference = scenario.total_payments - baseline.total_payments;

        let insights = self.insights(
            request,
            perturbation,
            &baseline,
            &scenario,
            interest_savings,
            months_saved,
        );

        ScenarioComparison {
            scenario_type: request.scenario_type,
            description: self.describe(perturbation),
            baseline,
            scenario,
            interest_savings,
            months_saved,
            payment_difference,
            insights,
        }
    }

    fn money(&self, amount: Decimal) -> String {
        format_currency(self.currency_symbol, amount)
    }

    fn describe(&self, perturbation: &Perturbation) -> String {
        match perturbation {
            Perturbation::ExtraPayment(amount) => {
                format!("Extra {} per month", self.money(*amount))
            }
            Perturbation::BudgetReduction(amount) => {
                format!("Budget reduced by {} per month", self.money(*amount))
            }
            Perturbation::InterestRateChange {
                rate_change_percent,
                affected,
            } => {
                let sign = if rate_change_percent.is_sign_negative() { "" } else { "+" };
                format!(
                    "Interest rate change of {sign}{rate_change_percent}% on {}",
                    affected.describe()
                )
            }
            Perturbation::DebtConsolidation { rate, affected, .. } => {
                format!("Consolidate {} at {rate}% APR", affected.describe())
            }
            Perturbation::Windfall(windfall) => format!(
                "Windfall of {} in Month {}",
                self.money(windfall.amount),
                windfall.month
            ),
        }
    }

    fn insights(
        &self,
        request: &WhatIfRequest,
        perturbation: &Perturbation,
        baseline: &PlanSummary,
        scenario: &PlanSummary,
        interest_savings: Decimal,
        months_saved: i64,
    ) -> Vec<String> {
        let mut insights = Vec::new();

        if months_saved != 0 {
            let months = months_saved.unsigned_abs();
            let years = Decimal::from(months) / dec!(12);
            if months_saved > 0 {
                insights.push(format!(
                    "You could be debt-free {months} months ({years:.1} years) earlier"
                ));
            } else {
                insights.push(format!(
                    "This extends your payoff by {months} months ({years:.1} years)"
                ));
            }
        }

        if interest_savings > Decimal::ZERO {
            insights.push(format!(
                "This scenario saves {} in interest",
                self.money(interest_savings)
            ));
        } else if interest_savings < Decimal::ZERO {
            insights.push(format!(
                "This scenario costs an additional {} in interest",
                self.money(-interest_savings)
            ));
        }

        if let Perturbation::ExtraPayment(extra) = perturbation {
            let extra_paid = *extra * Decimal::from(scenario.months);
            if interest_savings > Decimal::ZERO && extra_paid > Decimal::ZERO {
                let ratio = interest_savings / extra_paid;
                insights.push(format!(
                    "Every extra {sym}1 you pay saves {sym}{ratio:.2} in interest",
                    sym = self.currency_symbol
                ));
            }
        }

        match (baseline.payoff_reached, scenario.payoff_reached) {
            (true, false) => insights.push(format!(
                "This scenario does not reach debt-free within {} months",
                request.analysis_months
            )),
            (false, true) => insights.push(format!(
                "This scenario makes you debt-free within {} months",
                request.analysis_months
            )),
            _ => {}
        }

        if insights.is_empty() {
            insights.push(
                "This scenario does not change your payoff timeline or interest cost".to_string(),
            );
        }
        insights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DebtAccount;
    use rstest::rstest;

    fn ledger() -> DebtLedger {
        DebtLedger::new(
            vec![
                DebtAccount {
                    id: "cc".to_string(),
                    name: "CC".to_string(),
                    balance: dec!(100000),
                    apr: dec!(36),
                    minimum_payment: Some(dec!(3000)),
                },
                DebtAccount {
                    id: "loan".to_string(),
                    name: "Loan".to_string(),
                    balance: dec!(200000),
                    apr: dec!(12),
                    minimum_payment: Some(dec!(5000)),
                },
            ],
            &MinimumPaymentPolicy::default(),
        )
        .unwrap()
    }

    fn run(request: &WhatIfRequest) -> Result<ScenarioComparison> {
        let policy = MinimumPaymentPolicy::default();
        ScenarioModifier::new(&policy, "₹").compare(&ledger(), request)
    }

    #[rstest]
    #[case(dec!(500))]
    #[case(dec!(2000))]
    #[case(dec!(10000))]
    fn test_extra_payment_never_hurts(#[case] extra: Decimal) {
        let mut request = WhatIfRequest::new(ScenarioType::ExtraPayment, dec!(10000));
        request.extra_payment = Some(extra);
        let comparison = run(&request).unwrap();
        assert!(comparison.months_saved >= 0);
        assert!(comparison.interest_savings >= Decimal::ZERO);
        assert!(comparison.insights.iter().any(|i| i.contains("earlier")));
        assert!(comparison.insights.iter().any(|i| i.starts_with("Every extra ₹1")));
    }

    #[test]
    fn test_budget_reduction_extends_payoff() {
        let mut request = WhatIfRequest::new(ScenarioType::BudgetReduction, dec!(10000));
        request.budget_reduction = Some(dec!(1000));
        let comparison = run(&request).unwrap();
        assert!(comparison.months_saved < 0);
        assert!(comparison.interest_savings < Decimal::ZERO);
        assert!(comparison.insights.iter().any(|i| i.contains("extends")));
        assert!(comparison.insights.iter().any(|i| i.contains("costs an additional")));
    }

    #[test]
    fn test_budget_reduction_below_minimums_is_invalid() {
        let mut request = WhatIfRequest::new(ScenarioType::BudgetReduction, dec!(10000));
        request.budget_reduction = Some(dec!(2500));
        assert!(matches!(run(&request), Err(PlanError::InvalidScenario(_))));
    }

    #[test]
    fn test_rate_change_on_named_debt() {
        let mut request = WhatIfRequest::new(ScenarioType::InterestRateChange, dec!(10000));
        request.rate_change_percent = Some(dec!(-6));
        request.affected_debts = vec!["CC".to_string()];
        let comparison = run(&request).unwrap();
        assert!(comparison.interest_savings > Decimal::ZERO);
        assert_eq!(comparison.description, "Interest rate change of -6% on CC");
    }

    #[test]
    fn test_rate_change_to_negative_apr_is_invalid() {
        let mut request = WhatIfRequest::new(ScenarioType::InterestRateChange, dec!(10000));
        request.rate_change_percent = Some(dec!(-20));
        request.affected_debts = vec![ALL_DEBTS.to_string()];
        assert!(matches!(run(&request), Err(PlanError::InvalidScenario(_))));
    }

    #[test]
    fn test_rate_change_past_apr_limit_is_invalid() {
        let mut request = WhatIfRequest::new(ScenarioType::InterestRateChange, dec!(10000));
        request.rate_change_percent = Some(dec!(990));
        assert!(matches!(run(&request), Err(PlanError::InvalidScenario(_))));
    }

    #[test]
    fn test_unknown_affected_debt_is_invalid() {
        let mut request = WhatIfRequest::new(ScenarioType::InterestRateChange, dec!(10000));
        request.rate_change_percent = Some(dec!(2));
        request.affected_debts = vec!["Mortgage".to_string()];
        assert!(matches!(run(&request), Err(PlanError::InvalidScenario(_))));
    }

    #[test]
    fn test_consolidation_replaces_all_debts() {
        let policy = MinimumPaymentPolicy::default();
        let modifier = ScenarioModifier::new(&policy, "₹");
        let consolidated = modifier
            .consolidate(&ledger(), dec!(14), dec!(3000), &DebtSelection::All)
            .unwrap();
        assert_eq!(consolidated.len(), 1);
        let loan = &consolidated.debts()[0];
        assert_eq!(loan.name, CONSOLIDATED_NAME);
        assert_eq!(loan.balance, dec!(303000));
        assert_eq!(loan.apr, dec!(14));
        assert_eq!(loan.minimum_payment, dec!(6060));
    }

    #[test]
    fn test_consolidation_of_selected_debts_keeps_the_rest() {
        let policy = MinimumPaymentPolicy::default();
        let modifier = ScenarioModifier::new(&policy, "₹");
        let consolidated = modifier
            .consolidate(
                &ledger(),
                dec!(10),
                Decimal::ZERO,
                &DebtSelection::Named(vec!["loan".to_string()]),
            )
            .unwrap();
        let names: Vec<&str> = consolidated.debts().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["CC", CONSOLIDATED_NAME]);
    }

    #[test]
    fn test_consolidation_at_lower_rate_saves_interest() {
        let mut request = WhatIfRequest::new(ScenarioType::DebtConsolidation, dec!(10000));
        request.consolidation_rate = Some(dec!(10));
        let comparison = run(&request).unwrap();
        assert!(comparison.interest_savings > Decimal::ZERO);
        assert_eq!(comparison.description, "Consolidate all debts at 10% APR");
    }

    #[test]
    fn test_windfall() {
        let mut request = WhatIfRequest::new(ScenarioType::Windfall, dec!(10000));
        request.windfall_amount = Some(dec!(50000));
        request.windfall_month = 3;
        let comparison = run(&request).unwrap();
        assert!(comparison.months_saved > 0);
        assert!(comparison.interest_savings > Decimal::ZERO);
        assert_eq!(comparison.description, "Windfall of ₹50,000 in Month 3");
    }

    #[test]
    fn test_windfall_month_outside_window_is_invalid() {
        let mut request = WhatIfRequest::new(ScenarioType::Windfall, dec!(10000));
        request.windfall_amount = Some(dec!(50000));
        request.windfall_month = 61;
        assert!(matches!(run(&request), Err(PlanError::InvalidScenario(_))));
    }

    #[test]
    fn test_zero_extra_payment_reports_no_change() {
        let request = WhatIfRequest::new(ScenarioType::ExtraPayment, dec!(10000));
        let comparison = run(&request).unwrap();
        assert_eq!(comparison.months_saved, 0);
        assert_eq!(comparison.interest_savings, Decimal::ZERO);
        assert_eq!(
            comparison.insights,
            vec!["This scenario does not change your payoff timeline or interest cost"]
        );
    }

    #[test]
    fn test_negative_parameter_is_invalid() {
        let mut request = WhatIfRequest::new(ScenarioType::ExtraPayment, dec!(10000));
        request.extra_payment = Some(dec!(-100));
        assert!(matches!(run(&request), Err(PlanError::InvalidScenario(_))));
    }

    #[test]
    fn test_baseline_budget_errors_pass_through() {
        let request = WhatIfRequest::new(ScenarioType::ExtraPayment, dec!(100));
        assert!(matches!(run(&request), Err(PlanError::InsufficientBudget { .. })));
    }

    #[test]
    fn test_request_defaults_from_json() {
        let request: WhatIfRequest = serde_json::from_value(serde_json::json!({
            "scenario_type": "windfall",
            "base_budget": 10000,
            "windfall_amount": 25000
        }))
        .unwrap();
        assert_eq!(request.base_strategy, Strategy::Avalanche);
        assert_eq!(request.analysis_months, 60);
        assert_eq!(request.windfall_month, 1);
        assert!(request.affected_debts.is_empty());
        assert_eq!(
            request.perturbation().unwrap(),
            Perturbation::Windfall(Windfall {
                amount: dec!(25000),
                month: 1
            })
        );
    }
}
