//! IaaS API client.
//!
//! Issues one read-only call per poll: list all servers of a project.
//! No retries or backoff happen here; a failed call surfaces as a single
//! `InventoryError` and the caller decides what to do with the cycle.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{InventoryError, InventoryResult};
use crate::types::ServerListing;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "eu01";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body kept in `InventoryError::Status`.
const MAX_ERROR_BODY: usize = 512;

/// Printed in place of the bearer token.
const REDACTED: &str = "<redacted>";

/// Anything that can produce the current server list for a project.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn list_servers(&self, project_id: &str) -> InventoryResult<ServerListing>;
}

/// Connection settings for [`StackitClient`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL without trailing slash, e.g. `https://iaas.api.eu01.stackit.cloud`.
    pub api_url: String,
    /// Service account access token sent as a bearer token.
    pub token: String,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Config pointing at the regional IaaS endpoint.
    pub fn for_region(region: &str, token: impl Into<String>) -> Self {
        Self {
            api_url: regional_api_url(region),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the base URL (alternate environments, local fakes).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("token", &REDACTED)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Regional IaaS endpoint for `region`.
pub fn regional_api_url(region: &str) -> String {
    format!("https://iaas.api.{region}.stackit.cloud")
}

/// HTTP client for the STACKIT IaaS API.
#[derive(Clone)]
pub struct StackitClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl fmt::Debug for StackitClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackitClient")
            .field("api_url", &self.api_url)
            .field("token", &REDACTED)
            .finish_non_exhaustive()
    }
}

impl StackitClient {
    /// Build a client. Fails if the token is empty or the URL is unusable.
    pub fn new(config: ClientConfig) -> InventoryResult<Self> {
        if config.token.trim().is_empty() {
            return Err(InventoryError::MissingToken);
        }

        let api_url = config.api_url.trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(InventoryError::InvalidConfig(format!(
                "api url must be http(s): {api_url}"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("stackit-maintenance-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_url,
            token: config.token,
        })
    }

    /// Base URL this client talks to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn servers_url(&self, project_id: &str) -> String {
        format!("{}/v1/projects/{}/servers", self.api_url, project_id)
    }
}

#[async_trait]
impl InventorySource for StackitClient {
    async fn list_servers(&self, project_id: &str) -> InventoryResult<ServerListing> {
        let url = self.servers_url(project_id);
        debug!(%url, "listing servers");

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(InventoryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        let listing = ServerListing::from_json(&bytes)?;
        debug!(
            servers = listing.servers.len(),
            malformed = listing.malformed,
            "server list decoded"
        );
        Ok(listing)
    }
}
