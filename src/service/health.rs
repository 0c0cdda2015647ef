use http::{Response, StatusCode};
use serde::Serialize;

use crate::{
    config::TRAEFIK_API_ENV,
    core::DashboardError,
    metrics,
    traefik::TraefikClient,
    utils::response::ResponseBuilder,
};

pub const HEALTHY: &str = "healthy";
pub const UNHEALTHY: &str = "unhealthy";

/// Body of `GET /health`.
#[derive(Debug, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traefik_connected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: HEALTHY,
            traefik_connected: Some(true),
            error: None,
            status_code: None,
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            status: UNHEALTHY,
            traefik_connected: None,
            error: Some(format!("{TRAEFIK_API_ENV} environment variable not set")),
            status_code: None,
        }
    }

    pub fn unreachable(error: String) -> Self {
        Self {
            status: UNHEALTHY,
            traefik_connected: Some(false),
            error: Some(error),
            status_code: None,
        }
    }

    pub fn unexpected_status(code: u16) -> Self {
        Self {
            status: UNHEALTHY,
            traefik_connected: Some(false),
            error: None,
            status_code: Some(code),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY
    }

    pub fn http_status(&self) -> StatusCode {
        if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Probes Traefik right now. Never reads the router snapshot.
pub async fn check_health(client: Option<&TraefikClient>) -> HealthStatus {
    let Some(client) = client else {
        return HealthStatus::unconfigured();
    };

    match client.probe().await {
        Ok(()) => HealthStatus::healthy(),
        Err(DashboardError::UnexpectedStatus(code)) => HealthStatus::unexpected_status(code),
        Err(e) => HealthStatus::unreachable(e.detail()),
    }
}

pub async fn health_response(client: Option<&TraefikClient>) -> Response<Vec<u8>> {
    let health = check_health(client).await;
    metrics::record_health_check(health.is_healthy());
    if !health.is_healthy() {
        log::warn!("Health check failed: {health:?}");
    }
    ResponseBuilder::json(health.http_status(), &health)
}
