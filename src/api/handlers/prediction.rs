use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::error;

use crate::api::{state::AppState, types::ApiError};
use crate::domain::{PredictRequest, PredictResponse};
use crate::error::ConsumoError;

/// POST /predict
pub async fn predict_handler(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload.map_err(reject_body)?;

    if !state.service.is_ready() {
        return Err(ConsumoError::ModelUnavailable.into());
    }

    // Inference is CPU-bound; keep it off the async workers. The task runs to
    // completion even if the client goes away.
    let service = Arc::clone(&state.service);
    let response = tokio::task::spawn_blocking(move || service.predict(&request))
        .await
        .map_err(|e| {
            error!(error = %e, "inference task aborted");
            ApiError::internal("inference task aborted")
        })??;

    Ok(Json(response))
}

fn reject_body(rejection: JsonRejection) -> ApiError {
    let status = match rejection.status() {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        other => other,
    };
    ApiError::new(status, rejection.body_text())
}
