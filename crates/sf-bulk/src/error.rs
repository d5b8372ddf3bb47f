//! Error types for sf-bulk.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true for errors raised before any request was sent.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Validation(_) | ErrorKind::UnsupportedOperation(_)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Client error: {0}")]
    Client(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
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

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Decode(err.to_string()), err)
    }
}
