//! API shared state

use std::sync::Arc;

use crate::actors::MonitorHandle;
use crate::lifecycle::LifecycleManager;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Every alert read and write goes through the lifecycle manager
    pub lifecycle: Arc<LifecycleManager>,

    /// Handle to the monitor actor, absent when the API runs standalone
    pub monitor: Option<MonitorHandle>,

    /// Server start time, for uptime reporting
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl ApiState {
    pub fn new(lifecycle: Arc<LifecycleManager>, monitor: Option<MonitorHandle>) -> Self {
        Self {
            lifecycle,
            monitor,
            started_at: chrono::Utc::now(),
        }
    }
}
