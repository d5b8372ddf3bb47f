//! Job status polling.
//!
//! The poll loop is owned by the caller: [`JobPoller`] holds the policy and
//! drives any [`JobStatusSource`] until the job settles, the ceiling is
//! reached or the cancellation token fires.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::BulkApiClient;
use crate::error::Result;
use crate::types::{Job, JobProgress};

/// Default polling interval for job status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default ceiling on the total time spent polling.
pub const DEFAULT_POLL_CEILING: Duration = Duration::from_secs(120);

/// Anything that can report the progress of a job.
pub trait JobStatusSource {
    fn poll_status(&mut self) -> impl Future<Output = Result<JobProgress>> + Send;
}

/// Status source backed by the Bulk API.
pub struct JobStatus<'a> {
    client: &'a BulkApiClient,
    job: &'a mut Job,
}

impl<'a> JobStatus<'a> {
    pub fn new(client: &'a BulkApiClient, job: &'a mut Job) -> Self {
        Self { client, job }
    }
}

impl JobStatusSource for JobStatus<'_> {
    async fn poll_status(&mut self) -> Result<JobProgress> {
        self.client.check_job_status(self.job).await?;
        Ok(self.job.progress())
    }
}

/// Why polling stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Every batch finished.
    Completed,
    /// The job or one of its batches failed, or the job was aborted.
    Failed,
    /// The ceiling was reached first. Results may be partial.
    TimedOut,
    /// The cancellation token fired.
    Cancelled,
}

impl PollOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollOutcome::Completed => "completed",
            PollOutcome::Failed => "failed",
            PollOutcome::TimedOut => "timed-out",
            PollOutcome::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polling policy: fixed interval with a total ceiling.
///
/// No poll is issued once the elapsed time reaches the ceiling, so with the
/// defaults at most 60 polls happen.
#[derive(Debug, Clone, Copy)]
pub struct JobPoller {
    interval: Duration,
    ceiling: Duration,
}

impl Default for JobPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            ceiling: DEFAULT_POLL_CEILING,
        }
    }
}

impl JobPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the polling interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the polling ceiling.
    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Poll until the job settles, the ceiling is reached or `cancel` fires.
    ///
    /// A failing status call ends polling with that error.
    pub async fn run<S: JobStatusSource>(
        &self,
        source: &mut S,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome> {
        let start = Instant::now();
        let mut polls: u32 = 0;

        loop {
            if start.elapsed() >= self.ceiling {
                warn!(polls, ceiling = ?self.ceiling, "Job did not settle before the polling ceiling");
                return Ok(PollOutcome::TimedOut);
            }

            let progress = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                progress = source.poll_status() => progress?,
            };
            polls += 1;
            debug!(polls, ?progress, "Polled job");

            match progress {
                JobProgress::Completed => return Ok(PollOutcome::Completed),
                JobProgress::Failed | JobProgress::Aborted => return Ok(PollOutcome::Failed),
                JobProgress::Queued | JobProgress::InProgress => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                _ = sleep(self.interval) => {}
            }
        }
    }
}
