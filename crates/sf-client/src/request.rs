//! HTTP request building with Salesforce-specific headers.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::Result;

/// Header carrying the session id on Bulk API requests.
pub const SESSION_HEADER: &str = "X-SFDC-Session";

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    /// Convert to reqwest::Method.
    pub fn to_reqwest(&self) -> reqwest::Method {
        match self {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
        }
    }
}

/// Builder for HTTP requests with Salesforce-specific options.
#[derive(Debug)]
pub struct RequestBuilder {
    pub(crate) method: RequestMethod,
    pub(crate) url: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) body: Option<RequestBody>,
    pub(crate) bearer_token: Option<String>,
}

/// Request body content.
#[derive(Debug)]
pub enum RequestBody {
    Json(serde_json::Value),
    Text(String),
}

impl RequestBuilder {
    /// Create a new request builder.
    pub fn new(method: RequestMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            bearer_token: None,
        }
    }

    /// Target URL of the request.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Set the bearer token for authentication.
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Authenticate with the Bulk API session header.
    pub fn session_auth(self, session_id: impl Into<String>) -> Self {
        self.header(SESSION_HEADER, session_id)
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)?;
        self.body = Some(RequestBody::Json(value));
        self.headers.insert(
            "Content-Type".to_string(),
            "application/json; charset=UTF-8".to_string(),
        );
        Ok(self)
    }

    /// Set a text body with an explicit content type.
    pub fn body_with_type(mut self, body: impl Into<String>, content_type: &str) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self.headers
            .insert("Content-Type".to_string(), content_type.to_string());
        self
    }

    /// Set XML body (for SOAP).
    pub fn xml(mut self, data: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(data.into()));
        self.headers
            .insert("Content-Type".to_string(), "text/xml; charset=UTF-8".to_string());
        self
    }

    /// Set the SOAPAction header.
    pub fn soap_action(self, action: &str) -> Self {
        self.header("SOAPAction", action)
    }
}
