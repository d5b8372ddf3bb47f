//! Error types for sf-rest.

/// Result type alias for sf-rest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sf-rest operations.
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

    /// HTTP status of a failed call, if any.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Non-2xx response. The body is sanitized.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A request argument was rejected before any call was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport or configuration failure in the client layer.
    #[error("Client error: {0}")]
    Client(String),
}

impl From<busbar_sf_client::Error> for Error {
    fn from(err: busbar_sf_client::Error) -> Self {
        use busbar_sf_client::ErrorKind as ClientKind;

        let kind = match &err.kind {
            ClientKind::Http { status, body } => ErrorKind::Http {
                status: *status,
                body: body.clone(),
            },
            ClientKind::Json(message) | ClientKind::Xml(message) => {
                ErrorKind::Decode(message.clone())
            }
            _ => ErrorKind::Client(err.to_string()),
        };
        Error::with_source(kind, err)
    }
}
