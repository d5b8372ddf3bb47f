//! # sf-client
//!
//! Core HTTP client infrastructure for the export proxy.
//!
//! This crate provides:
//! - A pooled HTTP client (gzip/deflate, bounded idle connections)
//! - Session-bound request builders for the REST and Bulk APIs
//! - URL templates and endpoint resolution
//! - XML to JSON conversion for SOAP and Bulk API payloads
//! - Injection guards for SOQL identifiers, URL segments and XML content
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │  (sf-auth, sf-rest, sf-bulk, sf-proxy)                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SalesforceClient                          │
//! │  - Holds the session + HTTP client                          │
//! │  - Bearer auth for REST, X-SFDC-Session for Bulk            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SfHttpClient                             │
//! │  - Raw HTTP, single attempt, no retry                       │
//! │  - Non-2xx responses become HTTP errors with their body     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod client;
mod config;
mod error;
mod request;
mod response;
mod salesforce_client;
pub mod security;
pub mod template;
pub mod xml;

pub use client::SfHttpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use request::{RequestBuilder, RequestMethod, SESSION_HEADER};
pub use response::{sanitize_error_message, Response};
pub use salesforce_client::SalesforceClient;
pub use template::{Endpoints, LoginHost};

/// Default Salesforce API version
pub const DEFAULT_API_VERSION: &str = "44.0";

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("busbar-sf-export/", env!("CARGO_PKG_VERSION"));
