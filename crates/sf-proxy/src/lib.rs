//! # busbar-sf-proxy
//!
//! HTTP proxy that exports Salesforce objects through Bulk API query jobs.
//!
//! `GET /{entity}?since=<timestamp>` logs in, describes the entity, runs a
//! query job over every queryable field and streams the records back as a
//! JSON array. Each record carrying a `LastModifiedDate` gains a
//! `LastModifiedDateFormatted` field in canonical UTC.
//!
//! ```rust,ignore
//! use busbar_sf_proxy::{serve, ProxyConfig};
//!
//! #[tokio::main]
//! async fn main() -> busbar_sf_proxy::Result<()> {
//!     serve(ProxyConfig::from_env()?).await
//! }
//! ```

mod config;
mod error;
mod export;
pub mod responder;
mod routes;
mod server;

pub use config::{ProxyConfig, DEFAULT_PORT};
pub use error::{Error, ErrorKind, Result};
pub use export::{ExportRequest, ExportStream, Exporter};
pub use routes::{router, AppState, POLL_OUTCOME_HEADER};
pub use server::serve;
