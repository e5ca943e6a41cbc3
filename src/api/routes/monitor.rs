//! Manual monitoring round

use axum::{Json, extract::State};

use crate::actors::RoundSummary;
use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};

/// POST /api/monitor/run
///
/// Runs a round right away and returns its summary. Waits for a round that
/// is already in progress to finish first.
pub async fn run_now(State(state): State<ApiState>) -> ApiResult<Json<RoundSummary>> {
    let monitor = state
        .monitor
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("Monitor is not running".to_string()))?;

    Ok(Json(monitor.run_now().await?))
}
