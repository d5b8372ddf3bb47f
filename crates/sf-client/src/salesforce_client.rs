//! Session-bound Salesforce client.
//!
//! `SalesforceClient` pairs an authenticated session with the shared HTTP
//! client and knows how each API family authenticates: REST takes a bearer
//! token, the Bulk API takes the `X-SFDC-Session` header.
//!
//! ## Security
//!
//! - The session id is redacted in Debug output
//! - Sensitive parameters are skipped in tracing spans

use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::client::SfHttpClient;
use crate::error::Result;
use crate::request::RequestBuilder;
use crate::response::Response;
use crate::DEFAULT_API_VERSION;

/// Salesforce API client bound to one session.
///
/// # Example
///
/// ```rust,ignore
/// use busbar_sf_client::{SalesforceClient, SfHttpClient};
///
/// let http = SfHttpClient::default_client()?;
/// let client = SalesforceClient::from_http(http, "https://na1.salesforce.com", session_id);
///
/// let describe: serde_json::Value = client
///     .get_json(&client.rest_url("sobjects/Contact/describe"))
///     .await?;
/// ```
#[derive(Clone)]
pub struct SalesforceClient {
    http: SfHttpClient,
    instance_url: String,
    session_id: String,
    api_version: String,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("instance_url", &self.instance_url)
            .field("session_id", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl SalesforceClient {
    /// Create a client with its own connection pool.
    pub fn new(instance_url: impl Into<String>, session_id: impl Into<String>) -> Result<Self> {
        let http = SfHttpClient::default_client()?;
        Ok(Self::from_http(http, instance_url, session_id))
    }

    /// Create a client that shares an existing connection pool.
    pub fn from_http(
        http: SfHttpClient,
        instance_url: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            http,
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            session_id: session_id.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Set the API version (e.g., "44.0").
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Get the instance URL.
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// Get the session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Get the API version.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Build the REST API URL for a path.
    ///
    /// Example: `rest_url("sobjects/Contact/describe")` ->
    /// `{instance}/services/data/v44.0/sobjects/Contact/describe`
    pub fn rest_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url, self.api_version, path
        )
    }

    /// Build the Bulk API job URL for a path below `job`.
    ///
    /// Example: `bulk_url("750x/batch")` -> `{instance}/services/async/44.0/job/750x/batch`.
    /// An empty path addresses the job collection itself.
    pub fn bulk_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        let root = format!(
            "{}/services/async/{}/job",
            self.instance_url, self.api_version
        );
        if path.is_empty() {
            root
        } else {
            format!("{}/{}", root, path)
        }
    }

    // =========================================================================
    // Authenticated request builders
    // =========================================================================

    /// REST GET with bearer authentication.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.http.get(url).bearer_auth(&self.session_id)
    }

    /// Bulk API GET with the session header.
    pub fn bulk_get(&self, url: &str) -> RequestBuilder {
        self.http.get(url).session_auth(&self.session_id)
    }

    /// Bulk API POST with the session header.
    pub fn bulk_post(&self, url: &str) -> RequestBuilder {
        self.http.post(url).session_auth(&self.session_id)
    }

    /// Execute a request, failing on any non-2xx status.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.http.send(request).await
    }

    /// REST GET with JSON response deserialization.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.http.send_json(self.get(url)).await
    }
}
