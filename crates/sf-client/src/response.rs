//! HTTP response handling with Salesforce-specific extensions.

use regex_lite::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

use crate::error::{Error, ErrorKind, Result};

/// Salesforce access tokens: org id prefix, `!`, opaque tail.
static TOKEN_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"00[A-Za-z0-9]{13,}[!][A-Za-z0-9_.]+").ok());

static SESSION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"sid=[A-Za-z0-9]{20,}").ok());

const MAX_ERROR_BODY: usize = 500;

/// Wrapper around HTTP response with additional functionality.
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Get a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the response body as text.
    pub async fn text(self) -> Result<String> {
        self.inner.text().await.map_err(Into::into)
    }

    /// Deserialize the response body as JSON.
    ///
    /// The body is read fully before decoding so malformed payloads surface
    /// as JSON errors rather than transport errors.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.inner.bytes().await?;
        serde_json::from_slice(&body).map_err(Into::into)
    }

    /// Turn any non-2xx response into an [`ErrorKind::Http`] carrying the
    /// sanitized body.
    pub async fn error_for_status(self) -> Result<Response> {
        if self.is_success() {
            return Ok(self);
        }

        let status = self.status();
        let body = self.text().await.unwrap_or_default();
        Err(Error::new(ErrorKind::Http {
            status,
            body: sanitize_error_message(&body),
        }))
    }
}

/// Sanitize an error message to prevent exposing sensitive data.
///
/// Tokens and session ids are replaced, and long bodies are truncated.
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = message.trim().to_string();

    if let Some(pattern) = TOKEN_PATTERN.as_ref() {
        sanitized = pattern
            .replace_all(&sanitized, "[REDACTED_TOKEN]")
            .into_owned();
    }

    if let Some(pattern) = SESSION_PATTERN.as_ref() {
        sanitized = pattern
            .replace_all(&sanitized, "sid=[REDACTED]")
            .into_owned();
    }

    if sanitized.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }

    sanitized
}
