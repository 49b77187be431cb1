//! `repayment_engine` plans the repayment of several debts from one monthly budget.
//!
//! It simulates month-by-month amortization under three prioritization
//! strategies and compares a baseline plan against what-if scenarios:
//! - **Avalanche**: extra money goes to the highest APR first.
//! - **Snowball**: extra money goes to the smallest balance first.
//! - **Optimal**: the interest-minimizing order, which for this payment model
//!   is the APR-descending greedy allocation.
//!
//! All arithmetic uses [`rust_decimal::Decimal`]; amounts are rounded to two
//! decimal places only when a report is assembled.
//!
//! ## Usage
//!
//! ```rust
//! use repayment_engine::{DebtAccount, DebtLedger, MinimumPaymentPolicy, Strategy, generate_plan};
//! use rust_decimal_macros::dec;
//!
//! fn main() {
//!     let ledger = DebtLedger::new(
//!         vec![
//!             DebtAccount {
//!                 id: "cc".into(),
//!                 name: "Credit Card".into(),
//!                 balance: dec!(100_000),
//!                 apr: dec!(36),
//!                 minimum_payment: Some(dec!(3_000)),
//!             },
//!             DebtAccount {
//!                 id: "loan".into(),
//!                 name: "Personal Loan".into(),
//!                 balance: dec!(200_000),
//!                 apr: dec!(12),
//!                 minimum_payment: Some(dec!(5_000)),
//!             },
//!         ],
//!         &MinimumPaymentPolicy::default(),
//!     )
//!     .expect("valid ledger");
//!
//!     match generate_plan(&ledger, Strategy::Avalanche, dec!(10_000), 60) {
//!         Ok(plan) => {
//!             println!("Strategy:          {}", plan.strategy_name);
//!             println!("Months to payoff:  {:?}", plan.months_to_debt_free);
//!             println!("Total interest:    {:.2}", plan.total_interest_paid);
//!         }
//!         Err(e) => {
//!             eprintln!("Error generating plan: {}", e);
//!         }
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - `ledger`: validated starting balances and the minimum-payment policy
//! - `strategy`: per-month allocation of the budget
//! - `engine`: the amortization loop
//! - `scenario`: baseline-vs-perturbation comparisons
//! - `report`: plan/summary assembly and CSV export
//! - `backend`: the HTTP service over all of the above

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod report;
pub mod scenario;
pub mod strategy;

pub use engine::{MAX_HORIZON_MONTHS, MonthRecord, Simulation, SimulationParams, Windfall, simulate};
pub use error::{PlanError, Result};
pub use ledger::{DebtAccount, DebtLedger, DebtSummary, MinimumPaymentPolicy};
pub use report::{PlanSummary, RepaymentPlan, StrategyComparison, compare_strategies, generate_plan};
pub use scenario::{ScenarioComparison, ScenarioModifier, ScenarioType, WhatIfRequest};
pub use strategy::Strategy;
