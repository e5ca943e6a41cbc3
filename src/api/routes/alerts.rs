//! Alert endpoints
//!
//! Every handler goes through the lifecycle manager, the same entry point the
//! monitoring loop uses, so API writes follow the same dedup rules.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::debug;

use crate::alerts::{Alert, NewAlert};
use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{ListAlertsParams, MessageResponse, ResolveAllResponse},
};
use crate::storage::InsertOutcome;

/// GET /api/alerts
///
/// Query parameters: `resolved`, `deviceId`, `severity` (comma-separated),
/// `lastMinutes`. Newest first, at most 50 records.
pub async fn list_alerts(
    State(state): State<ApiState>,
    Query(params): Query<ListAlertsParams>,
) -> ApiResult<Json<Vec<Alert>>> {
    let query = params.into_query().map_err(ApiError::InvalidRequest)?;
    debug!("listing alerts with {query:?}");

    Ok(Json(state.lifecycle.list(query).await?))
}

/// POST /api/alerts
///
/// 201 with the new record, or 200 with the already open record that has
/// the same fingerprint.
pub async fn create_alert(
    State(state): State<ApiState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Alert>)> {
    let Json(raw) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let alert: NewAlert = serde_json::from_value(raw)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid alert payload: {e}")))?;

    match state.lifecycle.create(alert).await? {
        InsertOutcome::Created(alert) => Ok((StatusCode::CREATED, Json(alert))),
        InsertOutcome::Existing(alert) => Ok((StatusCode::OK, Json(alert))),
    }
}

/// PATCH /api/alerts/:id/resolve
pub async fn resolve_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Alert>> {
    state
        .lifecycle
        .resolve(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Alert not found".to_string()))
}

/// PATCH /api/alerts/device/:device_id/resolve-all
pub async fn resolve_all_for_device(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
) -> ApiResult<Json<ResolveAllResponse>> {
    let modified = state.lifecycle.resolve_all_for_device(&device_id).await?;

    Ok(Json(ResolveAllResponse {
        modified,
        message: format!("{modified} alerts resolved"),
    }))
}

/// DELETE /api/alerts/:id
pub async fn delete_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.lifecycle.delete(&id).await? {
        return Err(ApiError::NotFound("Alert not found".to_string()));
    }

    Ok(Json(MessageResponse {
        message: "Alert deleted successfully".to_string(),
    }))
}
