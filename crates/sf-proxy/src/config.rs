//! Proxy configuration.

use std::time::Duration;

use busbar_sf_auth::LoginCredentials;
use busbar_sf_bulk::{ContentType, DEFAULT_POLL_CEILING, DEFAULT_POLL_INTERVAL};
use busbar_sf_client::{Endpoints, DEFAULT_API_VERSION};

use crate::error::{Error, ErrorKind, Result};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Proxy configuration loaded from environment variables.
///
/// | Env Var                  | Default             |
/// |--------------------------|---------------------|
/// | `PORT`                   | `8080`              |
/// | `SALESFORCE_USERNAME`    | required            |
/// | `SALESFORCE_PASSWORD`    | required            |
/// | `SALESFORCE_USER_TOKEN`  | empty               |
/// | `SANDBOX`                | unset (production)  |
/// | `DEBUG`                  | unset               |
/// | `SALESFORCE_BASE_URL`    | platform hosts      |
/// | `SALESFORCE_API_VERSION` | `44.0`              |
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub port: u16,
    pub credentials: LoginCredentials,
    /// Raise the default log level to `debug`.
    pub debug: bool,
    pub endpoints: Endpoints,
    pub api_version: String,
    /// Format of job batches and results.
    pub content_type: ContentType,
    pub poll_interval: Duration,
    pub poll_ceiling: Duration,
}

impl ProxyConfig {
    /// Configuration with defaults for everything but the credentials.
    pub fn new(credentials: LoginCredentials) -> Self {
        Self {
            port: DEFAULT_PORT,
            credentials,
            debug: false,
            endpoints: Endpoints::default(),
            api_version: DEFAULT_API_VERSION.to_string(),
            content_type: ContentType::Json,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_ceiling: DEFAULT_POLL_CEILING,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = LoginCredentials::from_lookup(&lookup)
            .map_err(|err| Error::with_source(ErrorKind::Config(err.to_string()), err))?;
        let mut config = Self::new(credentials);

        if let Some(port) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
            config.port = port.trim().parse().map_err(|_| {
                Error::new(ErrorKind::Config(format!("PORT must be a port number, got '{}'", port)))
            })?;
        }

        config.debug = lookup("DEBUG").is_some_and(|v| !v.is_empty());

        if let Some(base) = lookup("SALESFORCE_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.endpoints = Endpoints::fixed(base.trim())?;
        }

        if let Some(version) = lookup("SALESFORCE_API_VERSION").filter(|v| !v.trim().is_empty()) {
            config.api_version = version.trim().to_string();
        }

        Ok(config)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Send every request to the given endpoints.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_ceiling(mut self, ceiling: Duration) -> Self {
        self.poll_ceiling = ceiling;
        self
    }

    /// Default tracing filter directive.
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}
