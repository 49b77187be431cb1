//! Month-by-month amortization of a debt ledger under a fixed monthly budget.
//!
//! Each simulated month:
//! 1. applies a scheduled lump sum (windfall), if one falls in this month;
//! 2. accrues interest on every open debt at `apr / 100 / 12`, computed on the
//!    balance before this month's payment;
//! 3. pays each open debt its minimum (capped at balance plus interest) and
//!    lets the [`Strategy`] spread the remaining budget;
//! 4. reduces balances by `payment - interest` and closes any debt whose
//!    balance falls to [`CLOSE_EPSILON`] or below;
//! 5. emits a [`MonthRecord`].
//!
//! The run stops once every debt is closed or `max_months` have been simulated.
//! Amounts are carried at full [`Decimal`] precision; rounding is left to the
//! report layer.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PlanError, Result};
use crate::ledger::{Debt, DebtLedger};
use crate::strategy::{OpenDebt, Strategy};

/// Hard upper bound on the simulated horizon.
pub const MAX_HORIZON_MONTHS: u32 = 600;

/// Balances at or below this are treated as paid off.
pub const CLOSE_EPSILON: Decimal = dec!(0.01);

/// A one-time lump sum applied at the start of `month` (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Windfall {
    pub amount: Decimal,
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub monthly_budget: Decimal,
    pub strategy: Strategy,
    pub max_months: u32,
    pub windfall: Option<Windfall>,
}

impl SimulationParams {
    pub fn new(monthly_budget: Decimal, strategy: Strategy, max_months: u32) -> Self {
        Self {
            monthly_budget,
            strategy,
            max_months,
            windfall: None,
        }
    }

    pub fn with_windfall(mut self, windfall: Windfall) -> Self {
        self.windfall = Some(windfall);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_months == 0 {
            return Err(PlanError::EmptyHorizon);
        }
        if self.max_months > MAX_HORIZON_MONTHS {
            return Err(PlanError::HorizonExceeded {
                requested: self.max_months,
                cap: MAX_HORIZON_MONTHS,
            });
        }
        if let Some(windfall) = &self.windfall {
            if windfall.amount < Decimal::ZERO {
                return Err(PlanError::InvalidInput(
                    "Windfall amount cannot be negative.".to_string(),
                ));
            }
            if windfall.month == 0 {
                return Err(PlanError::InvalidInput(
                    "Windfall month is 1-based.".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// What one debt received in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub debt_id: String,
    pub debt_name: String,
    pub payment: Decimal,
    pub interest_accrued: Decimal,
    /// Negative when the payment did not cover the interest.
    pub principal_reduction: Decimal,
    pub remaining_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRecord {
    /// 1-based.
    pub month_index: u32,
    /// One entry per debt open at the start of the month, in ledger order.
    pub allocations: Vec<AllocationEntry>,
    pub total_interest: Decimal,
    pub total_paid: Decimal,
    /// Budget no open debt could absorb; non-zero only in the final month.
    pub unallocated: Decimal,
    /// Windfall applied before this month's payments.
    pub lump_sum: Decimal,
    /// Outstanding balance across all debts after this month.
    pub ending_balance: Decimal,
}

/// The full output of one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub strategy: Strategy,
    pub monthly_budget: Decimal,
    pub max_months: u32,
    pub opening_balance: Decimal,
    pub months: Vec<MonthRecord>,
    /// `None` when debts remain open after `max_months`.
    pub debt_free_month: Option<u32>,
}

impl Simulation {
    pub fn payoff_reached(&self) -> bool {
        self.debt_free_month.is_some()
    }

    pub fn month_count(&self) -> u32 {
        self.months.len() as u32
    }

    pub fn total_interest(&self) -> Decimal {
        self.months.iter().map(|m| m.total_interest).sum()
    }

    /// Regular monthly payments, excluding lump sums.
    pub fn total_paid(&self) -> Decimal {
        self.months.iter().map(|m| m.total_paid).sum()
    }

    pub fn total_lump_sum(&self) -> Decimal {
        self.months.iter().map(|m| m.lump_sum).sum()
    }

    /// Opening balance followed by the balance after each month.
    pub fn balance_series(&self) -> Vec<Decimal> {
        std::iter::once(self.opening_balance)
            .chain(self.months.iter().map(|m| m.ending_balance))
            .collect()
    }
}

/// Runs the amortization loop over a private copy of `ledger`.
///
/// # Errors
///
/// - [`PlanError::EmptyHorizon`] / [`PlanError::HorizonExceeded`] for a
///   `max_months` of zero or above [`MAX_HORIZON_MONTHS`].
/// - [`PlanError::InsufficientBudget`] when the budget does not cover the
///   ledger's minimum payments.
/// - [`PlanError::InvalidInput`] for a negative or month-zero windfall.
/// - [`PlanError::AmountOverflow`] when unpaid interest compounds past what a
///   [`Decimal`] can hold.
///
/// Not reaching payoff within the horizon is not an error; it shows up as
/// `debt_free_month == None`.
pub fn simulate(ledger: &DebtLedger, params: &SimulationParams) -> Result<Simulation> {
    params.validate()?;
    ledger.ensure_budget(params.monthly_budget)?;

    let mut debts: Vec<Debt> = ledger.debts().to_vec();
    for debt in debts.iter_mut() {
        close_if_settled(debt);
    }
    let opening_balance = outstanding(&debts, 0)?;

    info!(
        target: "engine",
        strategy = %params.strategy,
        debts = debts.len(),
        budget = %params.monthly_budget,
        max_months = params.max_months,
        "Simulation started"
    );

    let mut months = Vec::new();
    let mut debt_free_month = if debts.iter().any(Debt::is_open) {
        None
    } else {
        Some(0)
    };

    if debt_free_month.is_none() {
        let mut interest_so_far = Decimal::ZERO;
        let mut paid_so_far = Decimal::ZERO;
        for month_index in 1..=params.max_months {
            let lump_sum = match params.windfall {
                Some(windfall) if windfall.month == month_index => {
                    apply_lump_sum(&mut debts, params.strategy, windfall.amount)
                }
                _ => Decimal::ZERO,
            };

            let record = run_month(&mut debts, params, month_index, lump_sum)?;
            interest_so_far = checked_sum([interest_so_far, record.total_interest], month_index)?;
            paid_so_far = checked_sum([paid_so_far, record.total_paid], month_index)?;
            debug!(
                target: "engine",
                month = month_index,
                paid = %record.total_paid,
                interest = %record.total_interest,
                remaining = %record.ending_balance,
                "Month simulated"
            );
            months.push(record);

            if !debts.iter().any(Debt::is_open) {
                debt_free_month = Some(month_index);
                break;
            }
        }
    }

    let simulation = Simulation {
        strategy: params.strategy,
        monthly_budget: params.monthly_budget,
        max_months: params.max_months,
        opening_balance,
        months,
        debt_free_month,
    };

    match simulation.debt_free_month {
        Some(month) => info!(
            target: "engine",
            strategy = %params.strategy,
            debt_free_month = month,
            total_interest = %simulation.total_interest(),
            "Simulation finished"
        ),
        None => warn!(
            target: "engine",
            strategy = %params.strategy,
            max_months = params.max_months,
            remaining = %simulation.months.last().map_or(opening_balance, |m| m.ending_balance),
            "Payoff not reached within horizon"
        ),
    }

    Ok(simulation)
}

fn run_month(
    debts: &mut [Debt],
    params: &SimulationParams,
    month_index: u32,
    lump_sum: Decimal,
) -> Result<MonthRecord> {
    let overflow = || PlanError::AmountOverflow { month: month_index };
    let open: Vec<usize> = (0..debts.len()).filter(|&i| debts[i].is_open()).collect();

    let interest: Vec<Decimal> = open
        .iter()
        .map(|&i| {
            let debt = &debts[i];
            debt.balance.checked_mul(debt.monthly_rate()).ok_or_else(overflow)
        })
        .collect::<Result<_>>()?;
    let views: Vec<OpenDebt<'_>> = open
        .iter()
        .zip(&interest)
        .map(|(&i, &accrued)| {
            let debt = &debts[i];
            debt.balance
                .checked_add(accrued)
                .ok_or_else(overflow)
                .map(|payable| OpenDebt {
                    id: &debt.id,
                    balance: debt.balance,
                    apr: debt.apr,
                    minimum: debt.minimum_payment.min(payable),
                    payable,
                })
        })
        .collect::<Result<_>>()?;

    let minimums = checked_sum(views.iter().map(|v| v.minimum), month_index)?;
    let allocation = params
        .strategy
        .allocate(&views, params.monthly_budget - minimums);
    if allocation.unallocated > Decimal::ZERO {
        debug!(
            target: "engine",
            month = month_index,
            unallocated = %allocation.unallocated,
            "Budget exceeds what the open debts owe"
        );
    }

    let mut allocations = Vec::with_capacity(open.len());
    for (k, &i) in open.iter().enumerate() {
        let debt = &mut debts[i];
        let payment = allocation.payments[k];
        let principal_reduction = payment - interest[k];
        if principal_reduction < Decimal::ZERO {
            warn!(
                target: "engine",
                month = month_index,
                debt = %debt.name,
                shortfall = %(-principal_reduction),
                "Payment does not cover interest; balance grows"
            );
        }
        debt.balance = debt
            .balance
            .checked_sub(principal_reduction)
            .ok_or_else(overflow)?;
        close_if_settled(debt);

        allocations.push(AllocationEntry {
            debt_id: debt.id.clone(),
            debt_name: debt.name.clone(),
            payment,
            interest_accrued: interest[k],
            principal_reduction,
            remaining_balance: debt.balance,
        });
    }

    Ok(MonthRecord {
        month_index,
        total_interest: checked_sum(interest.iter().copied(), month_index)?,
        total_paid: checked_sum(allocation.payments.iter().copied(), month_index)?,
        unallocated: allocation.unallocated,
        allocations,
        lump_sum,
        ending_balance: outstanding(debts, month_index)?,
    })
}

/// Pays `amount` straight off principal in strategy priority order and returns
/// how much was used. Anything beyond the total outstanding is left unused.
fn apply_lump_sum(debts: &mut [Debt], strategy: Strategy, amount: Decimal) -> Decimal {
    let mut remaining = amount;
    for index in strategy.priority_order(debts) {
        if remaining <= Decimal::ZERO {
            break;
        }
        let debt = &mut debts[index];
        if !debt.is_open() {
            continue;
        }
        let take = remaining.min(debt.balance);
        debt.balance -= take;
        remaining -= take;
        close_if_settled(debt);
    }
    let applied = amount - remaining;
    info!(target: "engine", applied = %applied, "Lump sum applied");
    applied
}

fn close_if_settled(debt: &mut Debt) {
    if debt.balance <= CLOSE_EPSILON {
        debt.balance = Decimal::ZERO;
    }
}

fn outstanding(debts: &[Debt], month: u32) -> Result<Decimal> {
    checked_sum(debts.iter().map(|d| d.balance), month)
}

fn checked_sum(values: impl IntoIterator<Item = Decimal>, month: u32) -> Result<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or(PlanError::AmountOverflow { month })
}
