//! Turns engine output into the plan, summary and CSV shapes clients consume.
//!
//! This is the only place amounts are rounded (to 2 decimal places).

use std::io::Write;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::{AllocationEntry, MonthRecord, Simulation, SimulationParams, simulate};
use crate::error::Result;
use crate::ledger::DebtLedger;
use crate::strategy::Strategy;

/// One row of the downloadable schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Debt Name")]
    pub debt_name: String,
    #[serde(rename = "Payment")]
    pub payment: Decimal,
    #[serde(rename = "Interest")]
    pub interest: Decimal,
    #[serde(rename = "Principal")]
    pub principal: Decimal,
    #[serde(rename = "Monthly Total")]
    pub monthly_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentPlan {
    pub strategy: Strategy,
    pub strategy_name: String,
    pub months: Vec<MonthRecord>,
    pub total_interest_paid: Decimal,
    pub total_paid: Decimal,
    /// `None` when the plan does not reach payoff within its horizon.
    pub months_to_debt_free: Option<u32>,
    pub payoff_reached: bool,
    pub schedule: Vec<ScheduleRow>,
    /// Total outstanding: the opening balance, then one value per month.
    pub balance_series: Vec<Decimal>,
}

impl RepaymentPlan {
    pub fn from_simulation(simulation: &Simulation) -> Self {
        let months: Vec<MonthRecord> = simulation.months.iter().map(round_month).collect();
        let schedule = schedule_rows(&months);

        Self {
            strategy: simulation.strategy,
            strategy_name: simulation.strategy.name().to_string(),
            months,
            total_interest_paid: simulation.total_interest().round_dp(2),
            total_paid: simulation.total_paid().round_dp(2),
            months_to_debt_free: simulation.debt_free_month,
            payoff_reached: simulation.payoff_reached(),
            schedule,
            balance_series: rounded_series(simulation),
        }
    }

    /// Writes the schedule as CSV with a header row.
    pub fn write_csv<W: Write>(&self, w: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(w);
        for row in &self.schedule {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_csv(&mut out)?;
        Ok(out)
    }
}

/// Condensed view of one run, used on both sides of a scenario comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub months: u32,
    pub total_interest: Decimal,
    /// Regular payments plus any lump sum.
    pub total_payments: Decimal,
    pub balance_series: Vec<Decimal>,
    pub months_to_debt_free: Option<u32>,
    pub payoff_reached: bool,
}

impl PlanSummary {
    pub fn from_simulation(simulation: &Simulation) -> Self {
        Self {
            months: simulation.month_count(),
            total_interest: simulation.total_interest().round_dp(2),
            total_payments: (simulation.total_paid() + simulation.total_lump_sum()).round_dp(2),
            balance_series: rounded_series(simulation),
            months_to_debt_free: simulation.debt_free_month,
            payoff_reached: simulation.payoff_reached(),
        }
    }
}

/// All three strategies run on the same inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub avalanche: RepaymentPlan,
    pub snowball: RepaymentPlan,
    pub optimal: RepaymentPlan,
    pub best_strategy: Strategy,
}

/// Simulates `ledger` under `strategy` and assembles the plan.
pub fn generate_plan(
    ledger: &DebtLedger,
    strategy: Strategy,
    monthly_budget: Decimal,
    max_months: u32,
) -> Result<RepaymentPlan> {
    let simulation = simulate(
        ledger,
        &SimulationParams::new(monthly_budget, strategy, max_months),
    )?;
    Ok(RepaymentPlan::from_simulation(&simulation))
}

/// Runs every strategy and picks the best: plans that reach payoff beat those
/// that don't, then lower total interest wins, then the earlier strategy in
/// avalanche, snowball, optimal order.
pub fn compare_strategies(
    ledger: &DebtLedger,
    monthly_budget: Decimal,
    max_months: u32,
) -> Result<StrategyComparison> {
    let [avalanche, snowball, optimal] = Strategy::all()
        .map(|strategy| generate_plan(ledger, strategy, monthly_budget, max_months));
    let (avalanche, snowball, optimal) = (avalanche?, snowball?, optimal?);

    let best_strategy = [&avalanche, &snowball, &optimal]
        .into_iter()
        .min_by_key(|plan| (!plan.payoff_reached, plan.total_interest_paid))
        .map(|plan| plan.strategy)
        .unwrap_or_default();

    Ok(StrategyComparison {
        avalanche,
        snowball,
        optimal,
        best_strategy,
    })
}

/// Formats `amount` in whole currency units with thousands separators.
pub fn format_currency(symbol: &str, amount: Decimal) -> String {
    let whole = amount.abs().round_dp(0);
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount.is_sign_negative() && !whole.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{symbol}{grouped}")
}

fn round_month(month: &MonthRecord) -> MonthRecord {
    MonthRecord {
        month_index: month.month_index,
        allocations: month
            .allocations
            .iter()
            .map(|a| AllocationEntry {
                debt_id: a.debt_id.clone(),
                debt_name: a.debt_name.clone(),
                payment: a.payment.round_dp(2),
                interest_accrued: a.interest_accrued.round_dp(2),
                principal_reduction: a.principal_reduction.round_dp(2),
                remaining_balance: a.remaining_balance.round_dp(2),
            })
            .collect(),
        total_interest: month.total_interest.round_dp(2),
        total_paid: month.total_paid.round_dp(2),
        unallocated: month.unallocated.round_dp(2),
        lump_sum: month.lump_sum.round_dp(2),
        ending_balance: month.ending_balance.round_dp(2),
    }
}

fn schedule_rows(months: &[MonthRecord]) -> Vec<ScheduleRow> {
    months
        .iter()
        .flat_map(|month| {
            month.allocations.iter().map(move |a| ScheduleRow {
                month: month.month_index,
                debt_name: a.debt_name.clone(),
                payment: a.payment,
                interest: a.interest_accrued,
                principal: a.principal_reduction,
                monthly_total: month.total_paid,
            })
        })
        .collect()
}

fn rounded_series(simulation: &Simulation) -> Vec<Decimal> {
    simulation
        .balance_series()
        .into_iter()
        .map(|b| b.round_dp(2))
        .collect()
}
