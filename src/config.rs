//! Service settings, read from a YAML file.
//!
//! ```yaml
//! bind_address: "0.0.0.0:3000"
//! currency_symbol: "₹"
//! default_max_months: 60
//! minimum_payment:
//!   percent_of_balance: 2
//!   floor: 50
//! available_budget: 15000
//! debts:
//!   - id: cc
//!     name: Credit Card
//!     balance: 100000
//!     apr: 36
//!     minimum_payment: 3000
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::MAX_HORIZON_MONTHS;
use crate::error::PlanError;
use crate::ledger::{DebtAccount, DebtLedger, MinimumPaymentPolicy};

/// Env var naming the settings file.
pub const CONFIG_ENV: &str = "REPAYMENT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_address: String,
    pub currency_symbol: String,
    /// Horizon used when a request does not name one.
    pub default_max_months: u32,
    pub minimum_payment: MinimumPaymentPolicy,
    /// Reported by the debt summary as the money available for repayment.
    pub available_budget: Decimal,
    /// Ledger served when a request carries no debts of its own.
    pub debts: Vec<DebtAccount>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            currency_symbol: "₹".to_string(),
            default_max_months: 60,
            minimum_payment: MinimumPaymentPolicy::default(),
            available_budget: Decimal::ZERO,
            debts: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml).context("Failed to parse settings YAML")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(target: "config", path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml_str(&yaml).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Loads the file named by `REPAYMENT_CONFIG`, or `config.yaml`.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.default_max_months == 0 || self.default_max_months > MAX_HORIZON_MONTHS {
            bail!(
                "default_max_months must be between 1 and {MAX_HORIZON_MONTHS}, got {}",
                self.default_max_months
            );
        }
        Ok(())
    }

    /// Builds a ledger from `accounts` using the configured minimum-payment policy.
    pub fn ledger_from(&self, accounts: Vec<DebtAccount>) -> Result<DebtLedger, PlanError> {
        DebtLedger::new(accounts, &self.minimum_payment)
    }

    /// The configured default ledger.
    pub fn ledger(&self) -> Result<DebtLedger, PlanError> {
        self.ledger_from(self.debts.clone())
    }
}
