mod handlers;
mod routes;

pub use handlers::{ApiError, CompareRequest, LedgerRequest, PlanRequest, WhatIfBody};

use std::sync::Arc;

use anyhow::Context;
use axum::{Router, routing::get};
use tracing::info;

use crate::config::Settings;
use crate::error::PlanError;
use crate::ledger::{DebtAccount, DebtLedger};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    /// Default ledger, validated once at startup.
    pub ledger: Arc<DebtLedger>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, PlanError> {
        let ledger = settings.ledger()?;
        Ok(Self {
            settings: Arc::new(settings),
            ledger: Arc::new(ledger),
        })
    }

    /// The request's own debts when it carries any, otherwise the default ledger.
    fn ledger_for(&self, debts: Option<Vec<DebtAccount>>) -> Result<DebtLedger, PlanError> {
        match debts {
            Some(accounts) => self.settings.ledger_from(accounts),
            None => Ok(DebtLedger::clone(&self.ledger)),
        }
    }

    fn max_months_or_default(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.settings.default_max_months)
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes())
        .with_state(state)
}

pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let addr = settings.bind_address.clone();
    let state = AppState::new(settings).context("Configured ledger is invalid")?;
    info!(target: "backend", debts = state.ledger.len(), "Default ledger loaded");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(target: "backend", "Server listening on http://{}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
