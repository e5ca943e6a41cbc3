//! Health check endpoint

use axum::{Json, extract::State, http::StatusCode};

use crate::api::{state::ApiState, types::HealthResponse};

/// GET /api/health
///
/// 200 when the alert store answers, 503 otherwise
pub async fn health_check(State(state): State<ApiState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, storage) = match state.lifecycle.store().health_check().await {
        Ok(health) if health.healthy => (StatusCode::OK, health.message),
        Ok(health) => (StatusCode::SERVICE_UNAVAILABLE, health.message),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    };

    let label = if status == StatusCode::OK { "ok" } else { "degraded" };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            storage,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}
