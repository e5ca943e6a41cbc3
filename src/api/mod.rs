//! REST API for the alert dashboard
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **LifecycleManager** shared with the monitoring loop for every alert write
//! - **MonitorHandle** for scheduler state and manual rounds
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check (never behind auth)
//! - `GET /api/stats` - Alert and target statistics
//! - `GET /api/alerts` (alias `GET /api/alerts/getAlerts`) - List alerts
//! - `POST /api/alerts` - Create an alert
//! - `PATCH /api/alerts/:id/resolve` - Resolve one alert
//! - `PATCH /api/alerts/device/:deviceId/resolve-all` - Resolve a device's alerts
//! - `DELETE /api/alerts/:id` - Delete an alert
//! - `POST /api/monitor/run` - Run a monitoring round now

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod middleware;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;
#[cfg(feature = "api")]
pub use types::{HealthResponse, MessageResponse, ResolveAllResponse, StatsResponse};

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use std::net::{Ipv4Addr, SocketAddr};
#[cfg(feature = "api")]
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:5000")
    pub bind_addr: SocketAddr,

    /// Optional authentication token
    pub auth_token: Option<String>,

    /// Enable CORS for dashboard
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 5000)),
            auth_token: None,
            enable_cors: true,
        }
    }
}

/// Build the router with all routes and layers
#[cfg(feature = "api")]
pub fn router(config: &ApiConfig, state: ApiState) -> Router {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let mut protected = Router::new()
        .route(
            "/api/alerts",
            get(routes::alerts::list_alerts).post(routes::alerts::create_alert),
        )
        .route("/api/alerts/getAlerts", get(routes::alerts::list_alerts))
        .route("/api/alerts/:id", delete(routes::alerts::delete_alert))
        .route("/api/alerts/:id/resolve", patch(routes::alerts::resolve_alert))
        .route(
            "/api/alerts/device/:device_id/resolve-all",
            patch(routes::alerts::resolve_all_for_device),
        )
        .route("/api/stats", get(routes::stats::get_stats))
        .route("/api/monitor/run", post(routes::monitor::run_now));

    // Add auth middleware if token provided
    if let Some(token) = config.auth_token.clone() {
        protected = protected.route_layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::auth_middleware,
        ));
    }

    let mut app = Router::new()
        .route("/api/health", get(routes::health::health_check))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Add CORS if enabled
    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(&config, state);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    // Spawn server in background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
