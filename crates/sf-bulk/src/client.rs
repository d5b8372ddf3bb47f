//! Bulk API 1.0 client.
//!
//! Provides the job lifecycle used for query exports: create a job, attach a
//! query batch, check status, fetch result sets and close the job. Polling
//! policy lives in [`crate::JobPoller`], so callers own the wait loop.

use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use tracing::{debug, instrument};

use busbar_sf_client::security::{soql, url::encode_param};
use busbar_sf_client::{RequestBuilder, SalesforceClient};

use crate::codec;
use crate::error::{Error, ErrorKind, Result};
use crate::types::*;

/// Salesforce Bulk API 1.0 client.
///
/// Every call goes to `{instance}/services/async/{version}/job` and carries
/// the `X-SFDC-Session` header. Nothing is retried.
///
/// # Example
///
/// ```rust,ignore
/// use busbar_sf_bulk::{BulkApiClient, JobPoller, JobRequest, JobStatus};
///
/// let client = BulkApiClient::from_client(salesforce_client);
///
/// let mut job = client.create_job(&JobRequest::query("Contact")).await?;
/// job.object_fields = vec!["Id".into(), "Name".into()];
/// client.add_batch_to_job(&mut job, None).await?;
///
/// let outcome = JobPoller::new()
///     .run(&mut JobStatus::new(&client, &mut job), &cancel)
///     .await?;
///
/// let records = client.get_job_result(&job).await?;
/// client.close_job(job).await?;
/// ```
#[derive(Debug, Clone)]
pub struct BulkApiClient {
    client: SalesforceClient,
}

impl BulkApiClient {
    /// Create a new Bulk API client.
    pub fn new(instance_url: impl Into<String>, session_id: impl Into<String>) -> Result<Self> {
        let client = SalesforceClient::new(instance_url, session_id)?;
        Ok(Self { client })
    }

    /// Create a Bulk API client from an existing SalesforceClient.
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

    async fn send_text(&self, request: RequestBuilder) -> Result<String> {
        let response = self.client.send(request).await?;
        Ok(response.text().await?)
    }

    // =========================================================================
    // Job Operations
    // =========================================================================

    /// Create a new job.
    #[instrument(skip(self, request), fields(object = %request.object, operation = request.operation.api_name()))]
    pub async fn create_job(&self, request: &JobRequest) -> Result<Job> {
        let body = codec::encode_job_request(request)?;
        let req = self
            .client
            .bulk_post(&self.client.bulk_url(""))
            .body_with_type(body, request.content_type.mime_type());

        let text = self.send_text(req).await?;
        let job = codec::decode_job(request.content_type, &text)?;
        debug!(job_id = %job.id, state = job.state.as_str(), "Created job");
        Ok(job)
    }

    /// Attach a query batch selecting `job.object_fields`.
    ///
    /// With `since`, only records modified after that instant are selected.
    /// The operation and field list are checked before any request is sent.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn add_batch_to_job(
        &self,
        job: &mut Job,
        since: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let query = build_batch_query(job, since)?;
        debug!(%query, "Adding batch");

        let url = self
            .client
            .bulk_url(&format!("{}/batch", encode_param(&job.id)));
        let req = self
            .client
            .bulk_post(&url)
            .body_with_type(query, job.content_type.mime_type());

        let text = self.send_text(req).await?;
        let batch = codec::decode_batch(job.content_type, &text)?;
        debug!(batch_id = %batch.id, "Batch attached");
        job.batches.push(batch);
        Ok(())
    }

    /// Refresh the job's state and counters. Attached batches are untouched.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn check_job_status(&self, job: &mut Job) -> Result<JobState> {
        let url = self.client.bulk_url(&encode_param(&job.id));
        let text = self.send_text(self.client.bulk_get(&url)).await?;
        let status = codec::decode_job(job.content_type, &text)?;
        job.refresh_from(status);

        debug!(
            state = job.state.as_str(),
            queued = job.number_batches_queued,
            in_progress = job.number_batches_in_progress,
            completed = job.number_batches_completed,
            failed = job.number_batches_failed,
            "Job status"
        );
        Ok(job.state)
    }

    /// Close a job. No batches can be added afterwards.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn close_job(&self, mut job: Job) -> Result<Job> {
        let body = codec::encode_state_change(job.content_type, JobState::Closed)?;
        let url = self.client.bulk_url(&encode_param(&job.id));
        let req = self
            .client
            .bulk_post(&url)
            .body_with_type(body, job.content_type.mime_type());

        let text = self.send_text(req).await?;
        let closed = codec::decode_job(job.content_type, &text)?;
        job.refresh_from(closed);
        debug!(state = job.state.as_str(), "Job closed");
        Ok(job)
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// Get the result set ids of one batch.
    #[instrument(skip(self, content_type))]
    pub async fn get_batch_result_ids(
        &self,
        content_type: ContentType,
        job_id: &str,
        batch_id: &str,
    ) -> Result<Vec<String>> {
        let url = self
            .client
            .bulk_url(&format!(
                "{}/batch/{}/result",
                encode_param(job_id),
                encode_param(batch_id)
            ));
        let text = self.send_text(self.client.bulk_get(&url)).await?;
        codec::decode_result_ids(content_type, &text)
    }

    /// Get the records of one result set.
    #[instrument(skip(self, content_type))]
    pub async fn get_result_set(
        &self,
        content_type: ContentType,
        job_id: &str,
        batch_id: &str,
        result_id: &str,
    ) -> Result<Vec<Record>> {
        let url = self.client.bulk_url(&format!(
            "{}/batch/{}/result/{}",
            encode_param(job_id),
            encode_param(batch_id),
            encode_param(result_id)
        ));
        let text = self.send_text(self.client.bulk_get(&url)).await?;
        let records = codec::decode_records(content_type, &text)?;
        debug!(records = records.len(), "Fetched result set");
        Ok(records)
    }

    /// Stream every result set of every attached batch, in batch order.
    ///
    /// One result set is held in memory at a time. The first failing fetch
    /// ends the stream with that error.
    pub fn job_result_stream<'a>(
        &'a self,
        job: &'a Job,
    ) -> impl Stream<Item = Result<Vec<Record>>> + Send + 'a {
        stream::iter(job.batches.iter().map(Ok::<_, Error>))
            .and_then(move |batch| async move {
                let ids = self
                    .get_batch_result_ids(job.content_type, &job.id, &batch.id)
                    .await?;
                Ok::<_, Error>((batch, ids))
            })
            .map_ok(move |(batch, ids)| {
                stream::iter(ids.into_iter().map(Ok::<_, Error>)).and_then(
                    move |result_id| async move {
                        self.get_result_set(job.content_type, &job.id, &batch.id, &result_id)
                            .await
                    },
                )
            })
            .try_flatten()
            .boxed()
    }

    /// Collect every record of the job.
    #[instrument(skip(self, job), fields(job_id = %job.id, batches = job.batches.len()))]
    pub async fn get_job_result(&self, job: &Job) -> Result<Vec<Record>> {
        let records: Vec<Record> = self.job_result_stream(job).try_concat().await?;
        debug!(records = records.len(), "Fetched job results");
        Ok(records)
    }
}

/// Build the SOQL of a query batch.
///
/// `SELECT f1, f2 FROM Object[ WHERE LastModifiedDate > 2023-11-14T22:13:20Z]`
pub fn build_batch_query(job: &Job, since: Option<DateTime<Utc>>) -> Result<String> {
    if !job.operation.is_query() {
        return Err(Error::new(ErrorKind::UnsupportedOperation(format!(
            "cannot add a query batch to a {} job",
            job.operation.api_name()
        ))));
    }

    if job.object_fields.is_empty() {
        return Err(Error::new(ErrorKind::Validation(
            "batch query must have at least one field".to_string(),
        )));
    }

    if !soql::is_safe_sobject_name(&job.object) {
        return Err(Error::new(ErrorKind::Validation(format!(
            "invalid SObject name '{}'",
            job.object
        ))));
    }

    if let Some(field) = soql::first_unsafe_field(&job.object_fields) {
        return Err(Error::new(ErrorKind::Validation(format!(
            "invalid field name '{}'",
            field
        ))));
    }

    let mut query = format!(
        "SELECT {} FROM {}",
        job.object_fields.join(", "),
        job.object
    );
    if let Some(since) = since {
        query.push_str(" WHERE LastModifiedDate > ");
        query.push_str(&since.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BASE: &str = "/services/async/44.0/job";

    fn job_json(id: &str, operation: &str, state: &str) -> serde_json::Value {
        json!({
            "id": id,
            "operation": operation,
            "object": "Contact",
            "contentType": "JSON",
            "state": state,
            "apiVersion": 44.0,
            "numberBatchesTotal": 1,
            "numberBatchesCompleted": 1
        })
    }

    fn job(operation: &str, fields: &[&str]) -> Job {
        let mut job: Job = serde_json::from_value(job_json("750x", operation, "Open")).unwrap();
        job.object_fields = fields.iter().map(|f| f.to_string()).collect();
        job
    }

    fn batch_json(id: &str) -> serde_json::Value {
        json!({"id": id, "jobId": "750x", "state": "Queued"})
    }

    async fn client_for(server: &MockServer) -> BulkApiClient {
        BulkApiClient::new(server.uri(), "sid-123").unwrap()
    }

    #[test]
    fn test_build_batch_query() {
        let job = job("query", &["Id", "Name"]);
        assert_eq!(
            build_batch_query(&job, None).unwrap(),
            "SELECT Id, Name FROM Contact"
        );

        let since = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        assert_eq!(
            build_batch_query(&job, Some(since)).unwrap(),
            "SELECT Id, Name FROM Contact WHERE LastModifiedDate > 2023-11-14T22:13:20Z"
        );
    }

    #[test]
    fn test_build_batch_query_rejects_unsafe_fields() {
        let job = job("query", &["Id", "Name FROM User --"]);
        let err = build_batch_query(&job, None).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_job() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(BASE))
            .and(header("X-SFDC-Session", "sid-123"))
            .and(header("Content-Type", "application/json; charset=UTF-8"))
            .and(body_json(json!({
                "operation": "query",
                "object": "Contact",
                "contentType": "JSON"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(job_json("750x", "query", "Open")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let job = client.create_job(&JobRequest::query("Contact")).await.unwrap();

        assert_eq!(job.id, "750x");
        assert_eq!(job.state, JobState::Open);
    }

    #[tokio::test]
    async fn test_create_job_error_body_is_kept() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(BASE))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "exceptionCode": "InvalidSessionId",
                "exceptionMessage": "Invalid session id"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let err = client.create_job(&JobRequest::query("Contact")).await.unwrap_err();

        match err.kind {
            ErrorKind::Http { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("InvalidSessionId"));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_add_batch_to_job() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("{}/750x/batch", BASE)))
            .and(header("X-SFDC-Session", "sid-123"))
            .and(body_string("SELECT Id, Name FROM Contact"))
            .respond_with(ResponseTemplate::new(201).set_body_json(batch_json("751x")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let mut job = job("query", &["Id", "Name"]);
        client.add_batch_to_job(&mut job, None).await.unwrap();

        assert_eq!(job.batches.len(), 1);
        assert_eq!(job.batches[0].id, "751x");
        assert_eq!(job.batches[0].state, BatchState::Queued);
    }

    #[tokio::test]
    async fn test_add_batch_preconditions_make_no_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(batch_json("751x")))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;

        let mut insert_job = job("insert", &["Id"]);
        let err = client.add_batch_to_job(&mut insert_job, None).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedOperation(_)));
        assert!(err.is_precondition());

        let mut empty_job = job("query", &[]);
        let err = client.add_batch_to_job(&mut empty_job, None).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Validation(_)));
        assert!(err.to_string().contains("batch query must have at least one field"));
        assert!(empty_job.batches.is_empty());
    }

    #[tokio::test]
    async fn test_check_job_status_keeps_batches() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/750x", BASE)))
            .and(header("X-SFDC-Session", "sid-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_json("750x", "query", "Closed")))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let mut job = job("query", &["Id"]);
        job.batches.push(serde_json::from_value(batch_json("751x")).unwrap());

        let state = client.check_job_status(&mut job).await.unwrap();

        assert_eq!(state, JobState::Closed);
        assert_eq!(job.batches.len(), 1);
        assert_eq!(job.object_fields, vec!["Id"]);
        assert_eq!(job.progress(), JobProgress::Completed);
    }

    #[tokio::test]
    async fn test_get_job_result() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/750x/batch/751a/result", BASE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["752a", "752b"])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/750x/batch/751b/result", BASE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["752c"])))
            .mount(&mock_server)
            .await;

        for (batch, result, id) in [("751a", "752a", "1"), ("751a", "752b", "2"), ("751b", "752c", "3")] {
            Mock::given(method("GET"))
                .and(path(format!("{}/750x/batch/{}/result/{}", BASE, batch, result)))
                .and(header("X-SFDC-Session", "sid-123"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"Id": id}])))
                .expect(1)
                .mount(&mock_server)
                .await;
        }

        let client = client_for(&mock_server).await;
        let mut job = job("query", &["Id"]);
        job.batches.push(serde_json::from_value(batch_json("751a")).unwrap());
        job.batches.push(serde_json::from_value(batch_json("751b")).unwrap());

        let records = client.get_job_result(&job).await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r["Id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_result_ids_are_encoded_as_path_segments() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/750x/batch/751x/result/752x%3Fy%2Fz", BASE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"Id": "1"}])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let records = client
            .get_result_set(ContentType::Json, "750x", "751x", "752x?y/z")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_job_result_stream_stops_at_first_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/750x/batch/751a/result", BASE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["752a", "752b"])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/750x/batch/751a/result/752a", BASE)))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/750x/batch/751a/result/752b", BASE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let mut job = job("query", &["Id"]);
        job.batches.push(serde_json::from_value(batch_json("751a")).unwrap());

        let err = client.get_job_result(&job).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Decode(_)));
    }

    #[tokio::test]
    async fn test_close_job() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("{}/750x", BASE)))
            .and(header("X-SFDC-Session", "sid-123"))
            .and(body_json(json!({"state": "Closed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_json("750x", "query", "Closed")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let closed = client.close_job(job("query", &["Id"])).await.unwrap();
        assert_eq!(closed.state, JobState::Closed);
    }
}
