use std::time::Duration;

use log::{debug, warn};

use crate::core::{DashboardError, DashboardResult};

use super::router::RawRouter;

/// Path of the HTTP router listing in the Traefik API.
pub const ROUTERS_PATH: &str = "/api/http/routers";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Stateless client for the Traefik API.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct TraefikClient {
    http: reqwest::Client,
    routers_url: String,
}

impl TraefikClient {
    pub fn new(base_url: &str, timeout: Duration) -> DashboardResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let routers_url = routers_url(base_url);
        if let Err(e) = reqwest::Url::parse(&routers_url) {
            warn!("Traefik API URL {base_url} is not a valid URL ({e}), requests will fail");
        }
        Ok(Self { http, routers_url })
    }

    pub fn routers_url(&self) -> &str {
        &self.routers_url
    }

    /// Fetches and decodes the current HTTP router list.
    pub async fn fetch_routers(&self) -> DashboardResult<Vec<RawRouter>> {
        let response = self.get().await?;
        let body = response.bytes().await?;
        let routers: Vec<RawRouter> = serde_json::from_slice(&body)?;
        debug!("Fetched {} routers from {}", routers.len(), self.routers_url);
        Ok(routers)
    }

    /// Checks that the API answers with a success status. The body is ignored.
    pub async fn probe(&self) -> DashboardResult<()> {
        self.get().await.map(|_| ())
    }

    async fn get(&self) -> DashboardResult<reqwest::Response> {
        let response = self.http.get(&self.routers_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::UnexpectedStatus(status.as_u16()));
        }
        Ok(response)
    }
}

fn routers_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), ROUTERS_PATH)
}
