//! Export pipeline.
//!
//! One export runs login, describe, job creation, batch attach, polling,
//! result fetching and job close in a spawned task. The caller learns how
//! polling ended before any record is sent, then receives result sets
//! through a bounded channel, one set at a time.
//!
//! A job that was created is closed exactly once, whatever happens after.

use std::sync::Arc;
use std::time::Duration;

use busbar_sf_auth::{LoginCredentials, SoapLoginClient};
use busbar_sf_bulk::{
    BulkApiClient, ContentType, Job, JobPoller, JobRequest, JobStatus, Operation, PollOutcome,
    Record,
};
use busbar_sf_client::{ClientConfig, SalesforceClient, SfHttpClient};
use busbar_sf_rest::SalesforceRestClient;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn, Instrument};

use crate::config::ProxyConfig;
use crate::error::{Error, ErrorKind, Result};

/// Result sets buffered between the pipeline task and the response body.
const RESULT_SET_BUFFER: usize = 1;

/// Maximum idle connections per host in the shared pool.
const POOL_MAX_IDLE: usize = 10;

/// Idle timeout of pooled connections.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// What to export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// sObject name, e.g. `Contact`.
    pub entity: String,
    /// Only export records modified after this instant.
    pub since: Option<DateTime<Utc>>,
}

impl ExportRequest {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            since: None,
        }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}

/// A running export.
#[derive(Debug)]
pub struct ExportStream {
    outcome: PollOutcome,
    result_sets: mpsc::Receiver<Result<Vec<Record>>>,
}

impl ExportStream {
    /// How polling ended.
    pub fn outcome(&self) -> PollOutcome {
        self.outcome
    }

    /// Records of every result set, in batch order.
    ///
    /// Dropping the stream stops result fetching; the job is still closed.
    pub fn into_records(self) -> impl Stream<Item = Result<Record>> + Send + 'static {
        stream::unfold(self.result_sets, |mut rx| async move {
            rx.recv().await.map(|set| (set, rx))
        })
        .map_ok(|set| stream::iter(set.into_iter().map(Ok::<_, Error>)))
        .try_flatten()
    }
}

/// Runs exports against one org with a shared connection pool.
#[derive(Debug, Clone)]
pub struct Exporter {
    http: SfHttpClient,
    login: SoapLoginClient,
    credentials: LoginCredentials,
    poller: JobPoller,
    api_version: String,
    content_type: ContentType,
}

impl Exporter {
    /// Build an exporter from the proxy configuration.
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let http = SfHttpClient::new(
            ClientConfig::builder()
                .with_pool_max_idle(POOL_MAX_IDLE)
                .with_pool_idle_timeout(POOL_IDLE_TIMEOUT)
                .build(),
        )?;

        let login = SoapLoginClient::new(http.clone())
            .with_endpoints(config.endpoints.clone())
            .with_api_version(&config.api_version);

        Ok(Self {
            http,
            login,
            credentials: config.credentials.clone(),
            poller: JobPoller::new()
                .with_interval(config.poll_interval)
                .with_ceiling(config.poll_ceiling),
            api_version: config.api_version.clone(),
            content_type: config.content_type,
        })
    }

    pub fn poller(&self) -> &JobPoller {
        &self.poller
    }

    /// Start an export and wait until polling has ended.
    ///
    /// Errors up to and including polling are returned here. Tripping
    /// `cancel` stops polling early and fails the export with
    /// [`ErrorKind::Cancelled`].
    pub async fn start(
        self: Arc<Self>,
        request: ExportRequest,
        cancel: CancellationToken,
    ) -> Result<ExportStream> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (results_tx, results_rx) = mpsc::channel(RESULT_SET_BUFFER);

        let span = tracing::info_span!("export", entity = %request.entity);
        tokio::spawn(
            self.run(request, cancel, ready_tx, results_tx)
                .instrument(span),
        );

        let outcome = ready_rx.await.map_err(|_| {
            Error::new(ErrorKind::Task(
                "export task ended without reporting".to_string(),
            ))
        })??;

        Ok(ExportStream {
            outcome,
            result_sets: results_rx,
        })
    }

    async fn run(
        self: Arc<Self>,
        request: ExportRequest,
        cancel: CancellationToken,
        ready: oneshot::Sender<Result<PollOutcome>>,
        results: mpsc::Sender<Result<Vec<Record>>>,
    ) {
        let (bulk, mut job) = match self.prepare(&request.entity).await {
            Ok(prepared) => prepared,
            Err(err) => {
                let _ = ready.send(Err(err));
                return;
            }
        };

        let outcome = match self.drive(&bulk, &mut job, request.since, &cancel).await {
            Ok(outcome) => outcome,
            Err(err) => {
                close(&bulk, job).await;
                let _ = ready.send(Err(err));
                return;
            }
        };

        if ready.send(Ok(outcome)).is_err() {
            debug!("Caller went away before results were fetched");
            close(&bulk, job).await;
            return;
        }

        forward_results(&bulk, &job, &results).await;
        // The response body ends when `results` is dropped, after the close.
        close(&bulk, job).await;
    }

    /// Log in, describe the entity and create its query job.
    #[instrument(skip(self))]
    async fn prepare(&self, entity: &str) -> Result<(BulkApiClient, Job)> {
        let session = self.login.login_with(&self.credentials).await?;
        let client = SalesforceClient::from_http(
            self.http.clone(),
            session.instance_url(),
            session.session_id(),
        )
        .with_api_version(&self.api_version);

        let rest = SalesforceRestClient::from_client(client.clone());
        let describe = rest.describe_sobject(entity).await?;

        let bulk = BulkApiClient::from_client(client);
        let request = JobRequest::new(entity, Operation::Query, self.content_type);
        let mut job = bulk.create_job(&request).await?;
        job.object_fields = describe.queryable_field_names();
        info!(job_id = %job.id, fields = job.object_fields.len(), "Created export job");

        Ok((bulk, job))
    }

    /// Attach the query batch and poll until the job settles.
    async fn drive(
        &self,
        bulk: &BulkApiClient,
        job: &mut Job,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome> {
        bulk.add_batch_to_job(job, since).await?;

        let outcome = self
            .poller
            .run(&mut JobStatus::new(bulk, job), cancel)
            .await?;
        info!(job_id = %job.id, %outcome, "Polling finished");

        match outcome {
            PollOutcome::Completed | PollOutcome::TimedOut => Ok(outcome),
            PollOutcome::Cancelled => Err(Error::new(ErrorKind::Cancelled)),
            PollOutcome::Failed => Err(Error::new(ErrorKind::JobFailed {
                job_id: job.id.clone(),
                state: job.state.as_str().to_string(),
            })),
        }
    }
}

/// Send every result set to `results`, stopping at the first error or when
/// the receiver is gone.
async fn forward_results(
    bulk: &BulkApiClient,
    job: &Job,
    results: &mpsc::Sender<Result<Vec<Record>>>,
) {
    let mut sets = bulk.job_result_stream(job);
    while let Some(set) = sets.next().await {
        let failed = set.is_err();
        if results.send(set.map_err(Error::from)).await.is_err() {
            debug!("Response body dropped, no more result sets fetched");
            break;
        }
        if failed {
            break;
        }
    }
}

/// Close a job, logging a failure instead of returning it.
async fn close(bulk: &BulkApiClient, job: Job) {
    let job_id = job.id.clone();
    if let Err(err) = bulk.close_job(job).await {
        warn!(%job_id, error = %err, "Failed to close job");
    }
}
