//! Error types for sf-auth.
//!
//! Error messages are designed to avoid exposing sensitive credential data.

/// Result type alias for sf-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sf-auth operations.
///
/// Error messages are sanitized to prevent accidental credential exposure.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if the login endpoint rejected the request with a SOAP fault.
    pub fn is_fault(&self) -> bool {
        matches!(self.kind, ErrorKind::Fault { .. })
    }
}

/// The kind of error that occurred.
///
/// Error messages avoid including credential values.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The login endpoint answered with a SOAP fault.
    #[error("Login failed: {fault_code} caused {fault_string}")]
    Fault {
        fault_code: String,
        fault_string: String,
    },

    /// The login response decoded but a required value could not be extracted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The login response body was not a readable SOAP envelope.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid credentials configuration.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// HTTP error during authentication.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Environment variable not set.
    #[error("Environment variable not set: {0}")]
    EnvVar(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<busbar_sf_client::Error> for Error {
    fn from(err: busbar_sf_client::Error) -> Self {
        use busbar_sf_client::ErrorKind as ClientKind;

        let kind = match &err.kind {
            ClientKind::Xml(message) | ClientKind::Json(message) => {
                ErrorKind::Decode(message.clone())
            }
            ClientKind::Template(message) | ClientKind::Config(message) => {
                ErrorKind::Config(message.clone())
            }
            _ => {
                // Sanitize any potential credential exposure
                let message = err.to_string();
                let sanitized = if message.contains("sessionId") || message.contains("password") {
                    "Client error (details redacted for security)".to_string()
                } else {
                    message
                };
                ErrorKind::Http(sanitized)
            }
        };
        Error::with_source(kind, err)
    }
}
