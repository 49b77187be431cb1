use axum::{
    Router,
    routing::{get, post},
};

use crate::backend::{AppState, handlers};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/plans/debt-summary",
            get(handlers::debt_summary).post(handlers::debt_summary_for),
        )
        .route("/api/v1/plans/generate", post(handlers::generate_plan))
        .route("/api/v1/plans/compare", post(handlers::compare_strategies))
        .route(
            "/api/v1/plans/validate-budget/:monthly_budget",
            get(handlers::validate_budget),
        )
        .route("/api/v1/plans/export", post(handlers::export_schedule))
        .route("/api/v1/scenarios/what-if", post(handlers::what_if))
}
