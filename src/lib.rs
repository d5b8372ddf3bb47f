//! # busbar-sf-export
//!
//! Salesforce export proxy built on the Bulk API.
//!
//! ## Security
//!
//! - Passwords and session ids are redacted in Debug output
//! - Tracing skips credential parameters
//! - Error messages relayed to callers are sanitized
//!
//! ## Crates
//!
//! - **busbar-sf-client** - HTTP transport, endpoint templates, XML helpers
//! - **busbar-sf-auth** - SOAP username/password login
//! - **busbar-sf-rest** - sObject describe
//! - **busbar-sf-bulk** - Bulk API 1.0 query jobs, job polling
//! - **busbar-sf-proxy** - HTTP entrypoint and streaming JSON responder
//!
//! ## Quick Start
//!
//! ```sh
//! export SALESFORCE_USERNAME=user@example.com
//! export SALESFORCE_PASSWORD=secret
//! cargo run --bin sf-export-proxy
//! curl 'http://localhost:8080/Contact?since=2023-11-14T22:13:20.000+0000'
//! ```

// Re-export all crates for convenient access
pub use busbar_sf_auth as auth;
pub use busbar_sf_bulk as bulk;
pub use busbar_sf_client as client;
pub use busbar_sf_proxy as proxy;
pub use busbar_sf_rest as rest;

// Re-export commonly used types at the top level
pub use busbar_sf_auth::{LoginCredentials, SoapLoginClient};
pub use busbar_sf_bulk::{BulkApiClient, JobPoller};
pub use busbar_sf_client::{ClientConfig, SalesforceClient};
pub use busbar_sf_proxy::{serve, ProxyConfig};
pub use busbar_sf_rest::SalesforceRestClient;
