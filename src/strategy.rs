//! Allocation strategies: how the budget left after minimums is spread across
//! open debts in a single month.
//!
//! Every strategy pays each open debt its minimum, then pours the extra budget
//! into debts in priority order. The top debt takes as much as it can absorb
//! (its balance plus this month's interest) and the remainder cascades to the
//! next one within the same month.
//!
//! - **Avalanche**: highest APR first, ties broken by larger balance.
//! - **Snowball**: smallest balance first, ties broken by higher APR.
//! - **Optimal**: the APR-descending greedy order. With a fixed monthly budget
//!   and independent simple monthly interest, directing every spare unit at the
//!   highest-rate balance minimizes total interest, so no separate optimizer
//!   is run; the variant exists so callers can label the plan distinctly.
//!
//! Remaining ties keep ledger order, which makes every allocation deterministic.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::ledger::Debt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Avalanche,
    Snowball,
    Optimal,
}

impl Strategy {
    pub fn all() -> [Self; 3] {
        [Self::Avalanche, Self::Snowball, Self::Optimal]
    }

    /// Display label used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Avalanche => "Debt Avalanche",
            Self::Snowball => "Debt Snowball",
            Self::Optimal => "Mathematical Optimal",
        }
    }

    /// Wire identifier, as accepted by [`FromStr`].
    pub fn key(&self) -> &'static str {
        match self {
            Self::Avalanche => "avalanche",
            Self::Snowball => "snowball",
            Self::Optimal => "optimal",
        }
    }

    fn compare(&self, a: &impl Prioritized, b: &impl Prioritized) -> Ordering {
        match self {
            Self::Avalanche | Self::Optimal => b
                .apr()
                .cmp(&a.apr())
                .then_with(|| b.balance().cmp(&a.balance())),
            Self::Snowball => a
                .balance()
                .cmp(&b.balance())
                .then_with(|| b.apr().cmp(&a.apr())),
        }
    }

    /// Indices into `items`, highest priority first.
    pub fn priority_order<T: Prioritized>(&self, items: &[T]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..items.len()).collect();
        // stable: equal keys keep ledger order
        order.sort_by(|&i, &j| self.compare(&items[i], &items[j]));
        order
    }

    /// Splits this month's payments across `debts`.
    ///
    /// `extra_budget` is what remains of the monthly budget after every debt's
    /// minimum. The returned payments are indexed like `debts`.
    pub fn allocate(&self, debts: &[OpenDebt<'_>], extra_budget: Decimal) -> MonthAllocation {
        let mut payments: Vec<Decimal> = debts.iter().map(|d| d.minimum).collect();
        let mut remaining = extra_budget.max(Decimal::ZERO);

        for index in self.priority_order(debts) {
            if remaining <= Decimal::ZERO {
                break;
            }
            let headroom = (debts[index].payable - payments[index]).max(Decimal::ZERO);
            let extra = remaining.min(headroom);
            payments[index] += extra;
            remaining -= extra;
        }

        MonthAllocation {
            payments,
            unallocated: remaining,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Strategy {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avalanche" => Ok(Self::Avalanche),
            "snowball" => Ok(Self::Snowball),
            "optimal" => Ok(Self::Optimal),
            other => Err(PlanError::InvalidInput(format!("Unknown strategy '{other}'."))),
        }
    }
}

/// The two keys a strategy ranks on.
pub trait Prioritized {
    fn balance(&self) -> Decimal;
    fn apr(&self) -> Decimal;
}

impl Prioritized for Debt {
    fn balance(&self) -> Decimal {
        self.balance
    }

    fn apr(&self) -> Decimal {
        self.apr
    }
}

/// An open debt as the allocator sees it this month.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenDebt<'a> {
    pub id: &'a str,
    /// Balance before this month's interest.
    pub balance: Decimal,
    pub apr: Decimal,
    /// Minimum payment, already capped at `payable`.
    pub minimum: Decimal,
    /// Balance plus this month's interest; no payment may exceed it.
    pub payable: Decimal,
}

impl Prioritized for OpenDebt<'_> {
    fn balance(&self) -> Decimal {
        self.balance
    }

    fn apr(&self) -> Decimal {
        self.apr
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthAllocation {
    pub payments: Vec<Decimal>,
    /// Extra budget no open debt could absorb; non-zero only in a final month.
    pub unallocated: Decimal,
}
