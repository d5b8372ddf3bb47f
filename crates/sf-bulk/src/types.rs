//! Types for Bulk API 1.0.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single result record.
pub type Record = Map<String, Value>;

/// Deserialize API version that can be either a float (44.0) or string ("44.0").
pub(crate) fn deserialize_api_version<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ApiVersion {
        Float(f64),
        String(String),
    }

    Option::<ApiVersion>::deserialize(deserializer).map(|opt| {
        opt.map(|v| match v {
            ApiVersion::Float(f) => format!("{:.1}", f),
            ApiVersion::String(s) => s,
        })
    })
}

/// Deserialize a counter sent as a number (JSON) or as text (XML).
pub(crate) fn deserialize_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Int(i64),
        Float(f64),
        String(String),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(0),
        Some(Count::Int(n)) => Ok(n),
        Some(Count::Float(f)) => Ok(f as i64),
        Some(Count::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Count::String(s)) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Bulk API 1.0 operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Insert,
    Update,
    Delete,
    Upsert,
    Query,
    QueryAll,
}

impl Operation {
    /// Get the API name for this operation.
    pub fn api_name(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Upsert => "upsert",
            Operation::Query => "query",
            Operation::QueryAll => "queryAll",
        }
    }

    /// Check if this operation reads records (and so accepts a query batch).
    pub fn is_query(&self) -> bool {
        matches!(self, Operation::Query | Operation::QueryAll)
    }
}

/// Content type of job requests and results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    #[default]
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "XML")]
    Xml,
}

impl ContentType {
    /// Get the API name for this content type.
    pub fn api_name(&self) -> &'static str {
        match self {
            ContentType::Json => "JSON",
            ContentType::Xml => "XML",
        }
    }

    /// MIME type used for request bodies of this content type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json; charset=UTF-8",
            ContentType::Xml => "application/xml; charset=UTF-8",
        }
    }
}

/// Bulk API 1.0 job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Job is open and accepting batches
    Open,
    /// No more batches will be accepted
    Closed,
    /// Job was aborted
    Aborted,
    /// Job failed
    Failed,
    /// Any state this client does not know about
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// Get the API name for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Open => "Open",
            JobState::Closed => "Closed",
            JobState::Aborted => "Aborted",
            JobState::Failed => "Failed",
            JobState::Unknown => "Unknown",
        }
    }
}

/// Bulk API 1.0 batch states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    Queued,
    InProgress,
    Completed,
    Failed,
    NotProcessed,
    #[serde(other)]
    Unknown,
}

impl BatchState {
    /// Check if the batch will not change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchState::Completed | BatchState::Failed | BatchState::NotProcessed
        )
    }
}

/// Lifecycle of a job as seen by a poller.
///
/// Derived from the job state and its batch counters, see [`Job::progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobProgress {
    Queued,
    InProgress,
    Completed,
    Failed,
    Aborted,
}

impl JobProgress {
    /// Check if polling can stop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobProgress::Completed | JobProgress::Failed | JobProgress::Aborted
        )
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Request to create a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub operation: Operation,
    pub object: String,
    pub content_type: ContentType,
}

impl JobRequest {
    /// Create a job request.
    pub fn new(object: impl Into<String>, operation: Operation, content_type: ContentType) -> Self {
        Self {
            operation,
            object: object.into(),
            content_type,
        }
    }

    /// Create a JSON query job request.
    pub fn query(object: impl Into<String>) -> Self {
        Self::new(object, Operation::Query, ContentType::Json)
    }

    /// Switch the request to another content type.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Job info.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Job ID
    pub id: String,
    /// Operation type
    pub operation: Operation,
    /// SObject API name
    pub object: String,
    /// Format of batches and results
    #[serde(default)]
    pub content_type: ContentType,
    /// Current state
    pub state: JobState,
    #[serde(default)]
    pub created_by_id: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub system_modstamp: Option<String>,
    #[serde(default)]
    pub concurrency_mode: Option<String>,
    /// API version (can be float like 44.0 or string like "44.0")
    #[serde(default, deserialize_with = "deserialize_api_version")]
    pub api_version: Option<String>,

    // === Batch counters ===
    #[serde(default, deserialize_with = "deserialize_count")]
    pub number_batches_queued: i64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub number_batches_in_progress: i64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub number_batches_completed: i64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub number_batches_failed: i64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub number_batches_total: i64,

    // === Record counters ===
    #[serde(default, deserialize_with = "deserialize_count")]
    pub number_records_processed: i64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub number_records_failed: i64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub number_retries: i64,

    // === Timing (milliseconds) ===
    #[serde(default, deserialize_with = "deserialize_count")]
    pub total_processing_time: i64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub api_active_processing_time: i64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub apex_processing_time: i64,

    /// Batches attached through this client, in attach order
    #[serde(skip)]
    pub batches: Vec<Batch>,
    /// Fields selected by the query batch
    #[serde(skip)]
    pub object_fields: Vec<String>,
}

impl Job {
    /// Derive the poller's view of this job.
    pub fn progress(&self) -> JobProgress {
        match self.state {
            JobState::Aborted => JobProgress::Aborted,
            JobState::Failed => JobProgress::Failed,
            _ if self.number_batches_failed > 0 => JobProgress::Failed,
            _ if self.number_batches_total == 0 => JobProgress::Queued,
            _ if self.number_batches_queued == 0 && self.number_batches_in_progress == 0 => {
                JobProgress::Completed
            }
            _ if self.number_batches_in_progress == 0
                && self.number_batches_completed == 0 =>
            {
                JobProgress::Queued
            }
            _ => JobProgress::InProgress,
        }
    }

    /// Copy server-side state and counters from a fresh status read.
    ///
    /// Locally held batches, field names and content type are kept. Status
    /// bodies may omit `contentType`, which would otherwise reset it to JSON.
    pub(crate) fn refresh_from(&mut self, status: Job) {
        let batches = std::mem::take(&mut self.batches);
        let object_fields = std::mem::take(&mut self.object_fields);
        *self = Job {
            batches,
            object_fields,
            content_type: self.content_type,
            ..status
        };
    }
}

/// Batch info.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub job_id: String,
    pub state: BatchState,
    #[serde(default)]
    pub state_message: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub system_modstamp: Option<String>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub number_records_processed: i64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub number_records_failed: i64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub total_processing_time: i64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub api_active_processing_time: i64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub apex_processing_time: i64,
}
