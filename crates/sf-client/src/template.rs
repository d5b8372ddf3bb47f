//! URL templates and endpoint resolution.
//!
//! Templates use `{name}` placeholders. [`fill`] refuses to return a string
//! that still contains one, so a missing parameter can never leak into a URL.

use regex_lite::Regex;
use std::sync::LazyLock;

use crate::error::{Error, ErrorKind, Result};

/// SOAP login endpoint. `{env}` is `login` or `test`.
pub const LOGIN_URL_TEMPLATE: &str = "https://{env}.salesforce.com/services/Soap/u/{api_version}";

/// Base URL of a platform instance.
pub const INSTANCE_URL_TEMPLATE: &str = "https://{instance}.salesforce.com";

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{[A-Za-z_][A-Za-z0-9_]*\}").ok());

/// Substitute `{name}` placeholders with the given values.
///
/// # Example
///
/// ```rust
/// use busbar_sf_client::template::fill;
///
/// let url = fill("https://{env}.example.com/v{v}", &[("env", "login"), ("v", "44.0")]).unwrap();
/// assert_eq!(url, "https://login.example.com/v44.0");
/// ```
pub fn fill(template: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!("{{{}}}", name), value);
    }

    if let Some(found) = PLACEHOLDER.as_ref().and_then(|re| re.find(&out)) {
        return Err(Error::new(ErrorKind::Template(format!(
            "unresolved placeholder {} in '{}'",
            found.as_str(),
            template
        ))));
    }

    Ok(out)
}

/// Which login host to authenticate against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginHost {
    /// `login.salesforce.com`
    #[default]
    Production,
    /// `test.salesforce.com`
    Sandbox,
}

impl LoginHost {
    /// Pick the host from a sandbox flag.
    pub fn from_sandbox(sandbox: bool) -> Self {
        if sandbox {
            LoginHost::Sandbox
        } else {
            LoginHost::Production
        }
    }

    /// Subdomain used in the login URL.
    pub fn env(&self) -> &'static str {
        match self {
            LoginHost::Production => "login",
            LoginHost::Sandbox => "test",
        }
    }
}

/// Build the SOAP login URL.
pub fn login_url(host: LoginHost, api_version: &str) -> Result<String> {
    fill(
        LOGIN_URL_TEMPLATE,
        &[("env", host.env()), ("api_version", api_version)],
    )
}

/// Build the base URL of an instance (`na1` -> `https://na1.salesforce.com`).
pub fn instance_url(instance: &str) -> Result<String> {
    fill(INSTANCE_URL_TEMPLATE, &[("instance", instance)])
}

/// Where login, REST and Bulk requests are sent.
///
/// By default the platform hosts are derived from the templates above. A fixed
/// base URL sends every request to one host instead, which is how the service
/// runs behind a forwarding proxy or against a test double.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Endpoints {
    #[default]
    Salesforce,
    Fixed(String),
}

impl Endpoints {
    /// Route every request to `base_url`.
    pub fn fixed(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)?;
        Ok(Endpoints::Fixed(base_url.trim_end_matches('/').to_string()))
    }

    /// Read `SALESFORCE_BASE_URL`, falling back to the platform hosts.
    pub fn from_env() -> Result<Self> {
        match std::env::var("SALESFORCE_BASE_URL") {
            Ok(base) if !base.trim().is_empty() => Self::fixed(base.trim()),
            _ => Ok(Endpoints::Salesforce),
        }
    }

    /// SOAP login URL for the given host and API version.
    pub fn login_url(&self, host: LoginHost, api_version: &str) -> Result<String> {
        match self {
            Endpoints::Salesforce => login_url(host, api_version),
            Endpoints::Fixed(base) => Ok(format!("{}/services/Soap/u/{}", base, api_version)),
        }
    }

    /// Base URL for REST and Bulk calls against `instance`.
    pub fn instance_url(&self, instance: &str) -> Result<String> {
        match self {
            Endpoints::Salesforce => instance_url(instance),
            Endpoints::Fixed(base) => Ok(base.clone()),
        }
    }
}
