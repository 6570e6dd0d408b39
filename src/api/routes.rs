use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/predict", post(handlers::predict_handler))
        // Probes
        .route("/health", get(handlers::health_handler))
        .route("/readyz", get(handlers::readiness_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
