use axum::{extract::State, http::StatusCode, Json};

use crate::api::{state::AppState, types::HealthResponse};

/// GET /health -- `ok` once the model is loaded, `ko` otherwise; always 200
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: state.service.health(),
    })
}

/// GET /readyz -- readiness probe for supervisors that route on status codes
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.service.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
