//! Salesforce REST API client.
//!
//! This client wraps `SalesforceClient` from `sf-client` and provides the
//! typed describe call the export pipeline uses to learn an object's fields.

use tracing::{debug, instrument};

use busbar_sf_client::security::soql;
use busbar_sf_client::SalesforceClient;

use crate::describe::DescribeSObjectResult;
use crate::error::{Error, ErrorKind, Result};

/// Salesforce REST API client.
///
/// # Example
///
/// ```rust,ignore
/// use busbar_sf_rest::SalesforceRestClient;
///
/// let client = SalesforceRestClient::new(
///     "https://na1.salesforce.com",
///     "session_id_here",
/// )?;
///
/// let describe = client.describe_sobject("Contact").await?;
/// println!("{:?}", describe.queryable_field_names());
/// ```
#[derive(Debug, Clone)]
pub struct SalesforceRestClient {
    client: SalesforceClient,
}

impl SalesforceRestClient {
    /// Create a new REST client with the given instance URL and session id.
    pub fn new(instance_url: impl Into<String>, session_id: impl Into<String>) -> Result<Self> {
        let client = SalesforceClient::new(instance_url, session_id)?;
        Ok(Self { client })
    }

    /// Create a REST client from an existing SalesforceClient.
    pub fn from_client(client: SalesforceClient) -> Self {
        Self { client }
    }

    /// Get the underlying SalesforceClient.
    pub fn inner(&self) -> &SalesforceClient {
        &self.client
    }

    /// Get the instance URL.
    pub fn instance_url(&self) -> &str {
        self.client.instance_url()
    }

    /// Get the API version.
    pub fn api_version(&self) -> &str {
        self.client.api_version()
    }

    // =========================================================================
    // Describe Operations
    // =========================================================================

    /// Get field metadata for a specific SObject.
    ///
    /// This is equivalent to calling `/services/data/vXX.0/sobjects/{sobject}/describe`.
    #[instrument(skip(self))]
    pub async fn describe_sobject(&self, sobject: &str) -> Result<DescribeSObjectResult> {
        if !soql::is_safe_sobject_name(sobject) {
            return Err(Error::new(ErrorKind::Validation(format!(
                "invalid SObject name '{}'",
                sobject
            ))));
        }

        let url = self.client.rest_url(&format!("sobjects/{}/describe", sobject));
        let result: DescribeSObjectResult = self.client.get_json(&url).await?;
        debug!(fields = result.fields.len(), "Described {}", result.name);
        Ok(result)
    }
}
