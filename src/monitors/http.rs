//! HTTP service checker
//!
//! Issues a `GET http://{ip}:{port}` and compares the status code with the
//! expected one (200 unless configured otherwise). A connection failure or
//! timeout is `Unreachable`; a response with another status is
//! `UnexpectedStatus`, which maps to a less severe fault.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{instrument, trace, warn};

use super::{ProbeChecker, ProbeError, ProbeOutcome, ProbeTarget, ProbeVerdict};
use crate::alerts::AlertProtocol;

/// Only this much of a response body is kept as diagnostic detail
const MAX_BODY_DETAIL: usize = 4096;

/// Checker for plain HTTP endpoints
#[derive(Debug, Clone)]
pub struct HttpChecker {
    /// HTTP client (reused across requests for efficiency)
    client: reqwest::Client,
    expected_status: u16,
}

impl HttpChecker {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            expected_status: 200,
        })
    }

    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    fn url(target: &ProbeTarget) -> Result<String, ProbeError> {
        let port = target.port.ok_or_else(|| {
            ProbeError::InvalidTarget(format!("HTTP target {} has no port", target.ip))
        })?;
        Ok(format!("http://{}", SocketAddr::new(target.ip, port)))
    }

    /// Keep the body as JSON when it is JSON, otherwise as (truncated) text
    fn body_detail(body: &str) -> serde_json::Value {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            return value;
        }
        let mut end = body.len().min(MAX_BODY_DETAIL);
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        serde_json::Value::String(body[..end].to_string())
    }
}

fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("Request timeout: {error}")
    } else if error.is_connect() {
        format!("Connection failed: {error}")
    } else {
        format!("HTTP request failed: {error}")
    }
}

#[async_trait]
impl ProbeChecker for HttpChecker {
    fn protocol(&self) -> AlertProtocol {
        AlertProtocol::Http
    }

    #[instrument(skip(self), fields(target = %target))]
    async fn check(&self, target: &ProbeTarget) -> Result<ProbeVerdict, ProbeError> {
        let url = Self::url(target)?;
        trace!("checking service at {url}");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = describe_error(&e);
                warn!("{url}: {error}");
                return Ok(ProbeVerdict::new(
                    ProbeOutcome::Unreachable,
                    json!({ "error": error }),
                ));
            }
        };

        let status = response.status().as_u16();
        if status == self.expected_status {
            return Ok(ProbeVerdict::new(
                ProbeOutcome::Healthy,
                json!({ "status": status }),
            ));
        }

        let body = match response.text().await {
            Ok(body) => Self::body_detail(&body),
            Err(e) => json!({ "error": format!("Failed to read response body: {e}") }),
        };

        trace!("{url}: unexpected status {status}");
        Ok(ProbeVerdict::new(ProbeOutcome::UnexpectedStatus(status), body))
    }
}
