//! # busbar-sf-bulk
//!
//! Salesforce Bulk API 1.0 (`services/async`) client for query exports.
//!
//! ## Features
//!
//! - **Job lifecycle** - Create, check and close jobs
//! - **Query batches** - Build and attach `SELECT` batches with identifier checks
//! - **Results** - Stream result sets batch by batch, or collect them
//! - **Polling** - Cancellable poll loop with an interval and a ceiling
//! - **JSON and XML** - Both content types for requests and results
//!
//! ## Example
//!
//! ```rust,ignore
//! use busbar_sf_bulk::{BulkApiClient, JobPoller, JobRequest, JobStatus, PollOutcome};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = BulkApiClient::new("https://na1.salesforce.com", session_id)?;
//!
//! let mut job = client.create_job(&JobRequest::query("Contact")).await?;
//! job.object_fields = vec!["Id".into(), "Name".into()];
//! client.add_batch_to_job(&mut job, None).await?;
//!
//! let cancel = CancellationToken::new();
//! let outcome = JobPoller::new()
//!     .run(&mut JobStatus::new(&client, &mut job), &cancel)
//!     .await?;
//!
//! if outcome == PollOutcome::Completed {
//!     let records = client.get_job_result(&job).await?;
//!     println!("Retrieved {} records", records.len());
//! }
//! client.close_job(job).await?;
//! ```

mod client;
pub mod codec;
mod error;
mod poller;
mod types;

pub use client::{build_batch_query, BulkApiClient};
pub use error::{Error, ErrorKind, Result};
pub use poller::{
    JobPoller, JobStatus, JobStatusSource, PollOutcome, DEFAULT_POLL_CEILING,
    DEFAULT_POLL_INTERVAL,
};
pub use types::*;
