//! # sf-auth
//!
//! Salesforce username/password authentication over the SOAP partner API.
//!
//! ## Security
//!
//! - Passwords and session ids are redacted in Debug output
//! - Tracing spans skip the password parameter
//! - Error messages sanitize any credential data
//!
//! ## Example
//!
//! ```rust,ignore
//! use busbar_sf_auth::{LoginCredentials, SoapLoginClient};
//! use busbar_sf_client::SfHttpClient;
//!
//! let creds = LoginCredentials::from_env()?;
//! let login = SoapLoginClient::new(SfHttpClient::default_client()?);
//! let session = login.login_with(&creds).await?;
//!
//! println!("instance: {}", session.instance());
//! ```

mod credentials;
mod error;
mod soap;

pub use credentials::LoginCredentials;
pub use error::{Error, ErrorKind, Result};
pub use soap::{extract_instance, login_envelope, Session, SoapLoginClient};
