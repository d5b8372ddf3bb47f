//! Error types for sf-proxy.
//!
//! Every failure of an export is answered with `500 text/plain` carrying the
//! error message, after being logged.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// Result type alias for sf-proxy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sf-proxy operations.
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
}

/// The kind of error that occurred.
///
/// Lower-layer errors keep their own message so the response body names the
/// actual cause (a login fault string, an HTTP status and body, ...).
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Login failed.
    #[error("{0}")]
    Auth(String),

    /// Describe call failed.
    #[error("{0}")]
    Rest(String),

    /// A Bulk API call failed.
    #[error("{0}")]
    Bulk(String),

    /// The job failed or was aborted on the server.
    #[error("Job {job_id} failed in state {state}")]
    JobFailed { job_id: String, state: String },

    /// Polling was cancelled because the client went away.
    #[error("Export cancelled")]
    Cancelled,

    /// A record could not be written to the response.
    #[error("Responder error: {0}")]
    Responder(String),

    /// The export task ended without reporting a result.
    #[error("Task error: {0}")]
    Task(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Socket or server failure.
    #[error("IO error: {0}")]
    Io(String),
}

impl From<busbar_sf_auth::Error> for Error {
    fn from(err: busbar_sf_auth::Error) -> Self {
        Error::with_source(ErrorKind::Auth(err.to_string()), err)
    }
}

impl From<busbar_sf_rest::Error> for Error {
    fn from(err: busbar_sf_rest::Error) -> Self {
        Error::with_source(ErrorKind::Rest(err.to_string()), err)
    }
}

impl From<busbar_sf_bulk::Error> for Error {
    fn from(err: busbar_sf_bulk::Error) -> Self {
        Error::with_source(ErrorKind::Bulk(err.to_string()), err)
    }
}

impl From<busbar_sf_client::Error> for Error {
    fn from(err: busbar_sf_client::Error) -> Self {
        Error::with_source(ErrorKind::Config(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Responder(err.to_string()), err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Io(err.to_string()), err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Export failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
