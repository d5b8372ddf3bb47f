//! Login credentials.
//!
//! The password is redacted in Debug output.

use crate::error::{Error, ErrorKind, Result};

/// Username/password credentials for the SOAP login.
///
/// The security token, when the org requires one, is already appended to
/// the password.
#[derive(Clone)]
pub struct LoginCredentials {
    username: String,
    password: String,
    sandbox: bool,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

impl LoginCredentials {
    /// Create credentials for a production org.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            sandbox: false,
        }
    }

    /// Append a security token to the password.
    pub fn with_security_token(mut self, token: &str) -> Self {
        self.password.push_str(token);
        self
    }

    /// Log in against the sandbox host instead of production.
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Get the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the password (with any security token appended).
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns true if the sandbox login host should be used.
    pub fn sandbox(&self) -> bool {
        self.sandbox
    }

    /// Load credentials from environment variables.
    ///
    /// Required environment variables:
    /// - `SALESFORCE_USERNAME`
    /// - `SALESFORCE_PASSWORD`
    ///
    /// Optional:
    /// - `SALESFORCE_USER_TOKEN` (appended to the password)
    /// - `SANDBOX` (any non-empty value selects the sandbox host)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load credentials through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = lookup("SALESFORCE_USERNAME")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::new(ErrorKind::EnvVar("SALESFORCE_USERNAME".to_string())))?;

        let password = lookup("SALESFORCE_PASSWORD")
            .ok_or_else(|| Error::new(ErrorKind::EnvVar("SALESFORCE_PASSWORD".to_string())))?;

        let token = lookup("SALESFORCE_USER_TOKEN").unwrap_or_default();
        let sandbox = lookup("SANDBOX").is_some_and(|v| !v.is_empty());

        Ok(Self::new(username, password)
            .with_security_token(&token)
            .with_sandbox(sandbox))
    }
}
