pub mod aggregator;
pub mod categories;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod google;
pub mod models;
pub mod openai;
pub mod planner;
pub mod polyline;
pub mod providers;
pub mod sampler;
#[doc(hidden)]
pub mod test_support;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{PlannerError, ValidationError};
use crate::models::{ApiError, FailureKind, TripPlanRequest, TripPlanResponse};
use crate::planner::TripPlanner;

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<TripPlanner>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/plan-trip", post(plan_trip_handler))
        .layer(cors)
        .with_state(state)
}

async fn ping_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn plan_trip_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TripPlanResponse>, (StatusCode, Json<ApiError>)> {
    let request: TripPlanRequest = serde_json::from_slice(&body).map_err(|err| {
        tracing::debug!("rejecting request body: {err}");
        planner_error_to_api_error(&state.planner, ValidationError::MalformedBody.into())
    })?;

    // Planning outlives the client connection.
    let planner = state.planner.clone();
    let outcome = tokio::spawn(async move { planner.plan_trip(&request).await })
        .await
        .unwrap_or_else(|err| Err(PlannerError::Internal(err.to_string())));

    outcome
        .map(Json)
        .map_err(|err| planner_error_to_api_error(&state.planner, err))
}

fn planner_error_to_api_error(planner: &TripPlanner, err: PlannerError) -> (StatusCode, Json<ApiError>) {
    let kind = err.kind();
    let status = match kind {
        FailureKind::Validation => StatusCode::BAD_REQUEST,
        FailureKind::NotFound | FailureKind::ExternalService => StatusCode::BAD_GATEWAY,
        FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if kind == FailureKind::Internal {
        tracing::error!("trip planning crashed: {err}");
    }

    (status, Json(error_body(planner, &err)))
}

/// JSON error body for a failed plan; unknown preferences also list the
/// labels the planner accepts.
pub fn error_body(planner: &TripPlanner, err: &PlannerError) -> ApiError {
    let mut body = ApiError::new(err.kind(), err.to_string());
    if matches!(err, PlannerError::Validation(ValidationError::UnknownPreferences(_))) {
        body.allowed_preferences = Some(planner.categories().labels());
    }
    body
}
