//! HTTP reachability probe
//!
//! HEADs the health endpoint; if that is not a success, HEADs the server root.
//! Only a 2xx answer counts as reachable, so captive portals and failing
//! backends read as offline.

use std::time::Duration;

use async_trait::async_trait;
use liefclock_core::ConnectivityProbe;
use liefclock_domain::{NetworkConfig, Result as DomainResult, ServerConfig};
use reqwest::Method;
use tracing::{debug, instrument};

use crate::http::HttpClient;

pub struct HttpReachabilityProbe {
    http_client: HttpClient,
    health_url: String,
    root_url: String,
    timeout: Duration,
}

impl HttpReachabilityProbe {
    pub fn new(base_url: &str, health_path: &str, timeout: Duration) -> DomainResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).max_attempts(1).build()?;
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            http_client,
            health_url: format!("{base}{health_path}"),
            root_url: format!("{base}/"),
            timeout,
        })
    }

    pub fn from_config(server: &ServerConfig, network: &NetworkConfig) -> DomainResult<Self> {
        Self::new(&server.base_url, &server.health_path, network.probe_timeout())
    }

    async fn head(&self, url: &str) -> bool {
        let request = self.http_client.request(Method::HEAD, url).header("Cache-Control", "no-cache");
        match tokio::time::timeout(self.timeout, self.http_client.send_once(request)).await {
            Ok(Ok(response)) => {
                let status = response.status();
                debug!(%url, %status, "reachability probe answered");
                status.is_success()
            }
            Ok(Err(err)) => {
                debug!(%url, error = %err, "reachability probe failed");
                false
            }
            Err(_) => {
                debug!(%url, timeout_ms = self.timeout.as_millis() as u64, "reachability probe timed out");
                false
            }
        }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpReachabilityProbe {
    #[instrument(skip(self))]
    async fn probe(&self) -> DomainResult<bool> {
        if self.head(&self.health_url).await {
            return Ok(true);
        }
        Ok(self.head(&self.root_url).await)
    }
}
