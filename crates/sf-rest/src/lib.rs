//! # sf-rest
//!
//! Salesforce REST API client for object schema lookup.
//!
//! ## Example
//!
//! ```rust,ignore
//! use busbar_sf_rest::SalesforceRestClient;
//!
//! let client = SalesforceRestClient::from_client(salesforce_client);
//! let describe = client.describe_sobject("Account").await?;
//! for name in describe.queryable_field_names() {
//!     println!("{name}");
//! }
//! ```

mod client;
mod describe;
mod error;

pub use client::SalesforceRestClient;
pub use describe::{DescribeSObjectResult, FieldDescribe};
pub use error::{Error, ErrorKind, Result};
