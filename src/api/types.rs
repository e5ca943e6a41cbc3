//! Request and response types of the alert API
//!
//! Responses derive `Deserialize` as well, so clients and tests can read
//! them back without redefining the shapes.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::actors::SchedulerState;
use crate::alerts::Severity;
use crate::storage::AlertQuery;
use crate::storage::backend::DEFAULT_LIST_LIMIT;

/// Query string of `GET /api/alerts`
///
/// Every field is kept as raw text so malformed values produce a clear
/// 400 instead of a generic extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAlertsParams {
    pub resolved: Option<String>,
    pub device_id: Option<String>,

    /// Comma-separated severities, e.g. `critical,major`
    pub severity: Option<String>,

    pub last_minutes: Option<String>,
}

impl ListAlertsParams {
    pub fn into_query(self) -> Result<AlertQuery, String> {
        let resolved = match self.resolved.as_deref() {
            None | Some("") => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => return Err(format!("resolved must be true or false, got '{other}'")),
        };

        let severities = match self.severity.as_deref() {
            None => Vec::new(),
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<Severity>())
                .collect::<Result<Vec<_>, _>>()?,
        };

        let created_after = match self.last_minutes.as_deref() {
            None | Some("") => None,
            Some(raw) => {
                let minutes: i64 = raw
                    .parse()
                    .ok()
                    .filter(|m| *m > 0)
                    .ok_or_else(|| format!("lastMinutes must be a positive integer, got '{raw}'"))?;
                let window = Duration::try_minutes(minutes)
                    .and_then(|window| Utc::now().checked_sub_signed(window))
                    .ok_or_else(|| format!("lastMinutes is out of range, got '{raw}'"))?;
                Some(window)
            }
        };

        Ok(AlertQuery {
            resolved,
            device_id: self.device_id.filter(|id| !id.is_empty()),
            severities,
            created_after,
            limit: Some(DEFAULT_LIST_LIMIT),
        })
    }
}

/// Response of `PATCH /api/alerts/device/:deviceId/resolve-all`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolveAllResponse {
    pub modified: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub timestamp: String,
    pub uptime_seconds: i64,
    pub total_alerts: usize,
    pub open_alerts: usize,
    pub devices: usize,
    pub services: usize,
    pub tracked_problems: usize,
    pub scheduler: Option<SchedulerState>,
}
