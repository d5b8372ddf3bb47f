//! SOAP (partner API) username/password login.
//!
//! The login call is the only SOAP exchange in the service. Every later call
//! depends on the session id and on the instance name derived from the
//! returned server URL, so a response missing either is fatal.

use regex_lite::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, instrument, warn};

use busbar_sf_client::security::xml::escape;
use busbar_sf_client::{xml, Endpoints, LoginHost, SfHttpClient, DEFAULT_API_VERSION};

use crate::credentials::LoginCredentials;
use crate::error::{Error, ErrorKind, Result};

static INSTANCE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"https://(.*?)\.").ok());

/// An authenticated session.
///
/// The session id is redacted in Debug output.
#[derive(Clone)]
pub struct Session {
    instance: String,
    instance_url: String,
    server_url: String,
    session_id: String,
    user_id: String,
    metadata_server_url: Option<String>,
    password_expired: bool,
    sandbox: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("instance", &self.instance)
            .field("instance_url", &self.instance_url)
            .field("server_url", &self.server_url)
            .field("session_id", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("password_expired", &self.password_expired)
            .field("sandbox", &self.sandbox)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Instance name, e.g. `na123`.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Base URL for REST and Bulk calls.
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// SOAP server URL returned by login.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Session token.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Id of the authenticated user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Metadata API server URL, when returned.
    pub fn metadata_server_url(&self) -> Option<&str> {
        self.metadata_server_url.as_deref()
    }

    /// Returns true if the user's password has expired.
    pub fn password_expired(&self) -> bool {
        self.password_expired
    }

    /// Returns true if the session belongs to a sandbox org.
    pub fn sandbox(&self) -> bool {
        self.sandbox
    }
}

/// Extract the instance name from a server URL.
///
/// `https://na123.salesforce.com/services/Soap/u/44.0/00D...` -> `na123`
pub fn extract_instance(server_url: &str) -> Result<String> {
    INSTANCE_PATTERN
        .as_ref()
        .and_then(|re| re.captures(server_url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|instance| !instance.is_empty())
        .ok_or_else(|| {
            Error::new(ErrorKind::Parse(format!(
                "cannot extract instance from server URL '{}'",
                server_url
            )))
        })
}

/// Build the login envelope. Credentials are XML-escaped.
pub fn login_envelope(username: &str, password: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<env:Envelope xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">
  <env:Body>
    <n1:login xmlns:n1="urn:partner.soap.sforce.com">
      <n1:username>{}</n1:username>
      <n1:password>{}</n1:password>
    </n1:login>
  </env:Body>
</env:Envelope>"#,
        escape(username),
        escape(password)
    )
}

fn text_at<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a str> {
    xml::find(doc, path).and_then(Value::as_str)
}

/// Turn a fault envelope into an [`ErrorKind::Fault`].
pub(crate) fn parse_fault(body: &str) -> Result<Error> {
    let doc = xml::to_json(body)?;
    let fault = xml::find(&doc, &["Body", "Fault"]).ok_or_else(|| {
        Error::new(ErrorKind::Decode(
            "response is not a SOAP fault envelope".to_string(),
        ))
    })?;

    Ok(Error::new(ErrorKind::Fault {
        fault_code: text_at(fault, &["faultcode"]).unwrap_or_default().to_string(),
        fault_string: text_at(fault, &["faultstring"])
            .unwrap_or("Unknown error")
            .to_string(),
    }))
}

/// Decode a successful login envelope.
pub(crate) fn parse_login_response(body: &str, endpoints: &Endpoints) -> Result<Session> {
    let doc = xml::to_json(body)?;
    let result = xml::find(&doc, &["Body", "loginResponse", "result"]).ok_or_else(|| {
        Error::new(ErrorKind::Decode(
            "login response has no loginResponse/result element".to_string(),
        ))
    })?;

    let required = |name: &str| {
        text_at(result, &[name])
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::new(ErrorKind::Parse(format!("login result missing {}", name))))
    };

    let server_url = required("serverUrl")?;
    let session_id = required("sessionId")?;
    let user_id = required("userId")?;
    let instance = extract_instance(&server_url)?;
    let instance_url = endpoints.instance_url(&instance)?;

    Ok(Session {
        instance,
        instance_url,
        server_url,
        session_id,
        user_id,
        metadata_server_url: text_at(result, &["metadataServerUrl"]).map(str::to_string),
        password_expired: text_at(result, &["passwordExpired"]) == Some("true"),
        sandbox: text_at(result, &["sandbox"]) == Some("true"),
    })
}

/// Client for the SOAP login endpoint.
#[derive(Debug, Clone)]
pub struct SoapLoginClient {
    http: SfHttpClient,
    endpoints: Endpoints,
    api_version: String,
}

impl SoapLoginClient {
    /// Create a login client on top of a shared HTTP client.
    pub fn new(http: SfHttpClient) -> Self {
        Self {
            http,
            endpoints: Endpoints::default(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Route login (and the derived instance URL) through custom endpoints.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set the API version (e.g., "44.0").
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Get the API version.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Log in with username and password.
    ///
    /// The password must already carry any security token. Neither credential
    /// is logged.
    #[instrument(skip(self, password), fields(sandbox))]
    pub async fn login(&self, username: &str, password: &str, sandbox: bool) -> Result<Session> {
        if username.is_empty() {
            return Err(Error::new(ErrorKind::InvalidCredentials(
                "username is empty".to_string(),
            )));
        }

        let url = self
            .endpoints
            .login_url(LoginHost::from_sandbox(sandbox), &self.api_version)?;

        let request = self
            .http
            .post(url)
            .xml(login_envelope(username, password))
            .soap_action("login");

        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        if status != 200 {
            let fault = parse_fault(&body)?;
            warn!(status, error = %fault, "Login rejected");
            return Err(fault);
        }

        let session = parse_login_response(&body, &self.endpoints)?;
        debug!(instance = %session.instance(), user_id = %session.user_id(), "Logged in");
        Ok(session)
    }

    /// Log in with stored credentials.
    pub async fn login_with(&self, credentials: &LoginCredentials) -> Result<Session> {
        self.login(
            credentials.username(),
            credentials.password(),
            credentials.sandbox(),
        )
        .await
    }
}
