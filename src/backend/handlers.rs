use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::backend::AppState;
use crate::error::PlanError;
use crate::ledger::{BudgetValidation, DebtAccount, DebtSummary};
use crate::report::{self, RepaymentPlan, StrategyComparison};
use crate::scenario::{ScenarioComparison, ScenarioModifier, WhatIfRequest};
use crate::strategy::Strategy;

#[derive(Debug, Deserialize, Serialize)]
pub struct PlanRequest {
    pub strategy: Strategy,
    pub monthly_budget: Decimal,
    #[serde(default)]
    pub max_months: Option<u32>,
    #[serde(default)]
    pub debts: Option<Vec<DebtAccount>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CompareRequest {
    pub monthly_budget: Decimal,
    #[serde(default)]
    pub max_months: Option<u32>,
    #[serde(default)]
    pub debts: Option<Vec<DebtAccount>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LedgerRequest {
    pub debts: Vec<DebtAccount>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WhatIfBody {
    #[serde(flatten)]
    pub request: WhatIfRequest,
    #[serde(default)]
    pub debts: Option<Vec<DebtAccount>>,
}

/// A [`PlanError`] rendered as `{"error": kind, "detail": message}`.
#[derive(Debug)]
pub struct ApiError(pub PlanError);

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        warn!(target: "backend", kind = self.0.kind(), error = %self.0, "Request failed");
        let body = Json(json!({
            "error": self.0.kind(),
            "detail": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

pub async fn debt_summary(State(state): State<AppState>) -> Json<DebtSummary> {
    Json(state.ledger.summary(state.settings.available_budget))
}

pub async fn debt_summary_for(
    State(state): State<AppState>,
    Json(payload): Json<LedgerRequest>,
) -> Result<Json<DebtSummary>, ApiError> {
    let ledger = state.ledger_for(Some(payload.debts))?;
    Ok(Json(ledger.summary(state.settings.available_budget)))
}

fn build_plan(state: &AppState, payload: PlanRequest) -> Result<RepaymentPlan, PlanError> {
    let ledger = state.ledger_for(payload.debts)?;
    let max_months = state.max_months_or_default(payload.max_months);
    info!(
        target: "backend",
        strategy = %payload.strategy,
        budget = %payload.monthly_budget,
        max_months,
        "Generating repayment plan"
    );
    report::generate_plan(&ledger, payload.strategy, payload.monthly_budget, max_months)
}

pub async fn generate_plan(
    State(state): State<AppState>,
    Json(payload): Json<PlanRequest>,
) -> Result<Json<RepaymentPlan>, ApiError> {
    let plan = build_plan(&state, payload)?;
    Ok(Json(plan))
}

pub async fn compare_strategies(
    State(state): State<AppState>,
    Json(payload): Json<CompareRequest>,
) -> Result<Json<StrategyComparison>, ApiError> {
    let ledger = state.ledger_for(payload.debts)?;
    let max_months = state.max_months_or_default(payload.max_months);
    let comparison = report::compare_strategies(&ledger, payload.monthly_budget, max_months)?;
    info!(target: "backend", best = %comparison.best_strategy, "Strategies compared");
    Ok(Json(comparison))
}

pub async fn validate_budget(
    State(state): State<AppState>,
    Path(monthly_budget): Path<String>,
) -> Result<Json<BudgetValidation>, ApiError> {
    let monthly_budget = Decimal::from_str(&monthly_budget).map_err(|e| {
        PlanError::InvalidInput(format!("monthly_budget '{monthly_budget}': {e}"))
    })?;
    Ok(Json(state.ledger.validate_budget(monthly_budget)))
}

pub async fn export_schedule(
    State(state): State<AppState>,
    Json(payload): Json<PlanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let plan = build_plan(&state, payload)?;
    let body = plan.to_csv_bytes()?;
    let filename = format!("attachment; filename=\"{}_schedule.csv\"", plan.strategy.key());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    ))
}

pub async fn what_if(
    State(state): State<AppState>,
    Json(payload): Json<WhatIfBody>,
) -> Result<Json<ScenarioComparison>, ApiError> {
    let ledger = state.ledger_for(payload.debts)?;
    let modifier = ScenarioModifier::new(
        &state.settings.minimum_payment,
        &state.settings.currency_symbol,
    );
    let comparison = modifier.compare(&ledger, &payload.request)?;
    Ok(Json(comparison))
}
