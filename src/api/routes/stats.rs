//! System statistics endpoint

use axum::{Json, extract::State};

use crate::api::{error::ApiResult, state::ApiState, types::StatsResponse};

/// GET /api/stats
///
/// Alert counts, tracked problems and monitored target counts
pub async fn get_stats(State(state): State<ApiState>) -> ApiResult<Json<StatsResponse>> {
    let alerts = state.lifecycle.stats().await?;
    let now = chrono::Utc::now();

    Ok(Json(StatsResponse {
        timestamp: now.to_rfc3339(),
        uptime_seconds: (now - state.started_at).num_seconds(),
        total_alerts: alerts.total,
        open_alerts: alerts.open,
        devices: state.monitor.as_ref().map_or(0, |m| m.device_count()),
        services: state.monitor.as_ref().map_or(0, |m| m.service_count()),
        tracked_problems: state.lifecycle.tracker_len().await,
        scheduler: state.monitor.as_ref().map(|m| m.state()),
    }))
}
