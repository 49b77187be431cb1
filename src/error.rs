//! Error type shared by every planning operation.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Budget ({budget}) is less than total minimum payments ({required}).")]
    InsufficientBudget { budget: Decimal, required: Decimal },

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Requested horizon of {requested} months exceeds the limit of {cap} months.")]
    HorizonExceeded { requested: u32, cap: u32 },

    #[error("Total months cannot be zero.")]
    EmptyHorizon,

    #[error("Malformed ledger: {0}")]
    MalformedLedger(String),

    #[error("Balances outgrew the representable range in month {month}.")]
    AmountOverflow { month: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlanError {
    /// Stable identifier reported to API clients alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientBudget { .. } => "insufficient_budget",
            Self::InvalidScenario(_) => "invalid_scenario",
            Self::HorizonExceeded { .. } => "horizon_exceeded",
            Self::EmptyHorizon => "empty_horizon",
            Self::MalformedLedger(_) => "malformed_ledger",
            Self::AmountOverflow { .. } => "amount_overflow",
            Self::InvalidInput(_) => "invalid_input",
            Self::Csv(_) => "csv",
            Self::Io(_) => "io",
        }
    }

    /// True for errors caused by the caller's input rather than by the process.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Csv(_) | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;
