//! Request encoding and response decoding per job content type.
//!
//! XML responses are converted to JSON documents by `busbar_sf_client::xml`
//! and then decoded with the same serde types as JSON responses.

use serde::de::DeserializeOwned;
use serde_json::Value;

use busbar_sf_client::security::xml::escape;
use busbar_sf_client::xml;

use crate::error::{Error, ErrorKind, Result};
use crate::types::{Batch, ContentType, Job, JobRequest, JobState, Record};

/// Namespace of Bulk API 1.0 XML documents.
pub const ASYNC_API_NAMESPACE: &str = "http://www.force.com/2009/06/asyncapi/dataload";

// =============================================================================
// Encoding
// =============================================================================

/// Encode a job creation request.
pub fn encode_job_request(request: &JobRequest) -> Result<String> {
    match request.content_type {
        ContentType::Json => Ok(serde_json::to_string(request)?),
        ContentType::Xml => Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<jobInfo xmlns="{}">
  <operation>{}</operation>
  <object>{}</object>
  <contentType>{}</contentType>
</jobInfo>"#,
            ASYNC_API_NAMESPACE,
            request.operation.api_name(),
            escape(&request.object),
            request.content_type.api_name()
        )),
    }
}

/// Encode a job state change (used to close a job).
pub fn encode_state_change(content_type: ContentType, state: JobState) -> Result<String> {
    match content_type {
        ContentType::Json => Ok(serde_json::to_string(&serde_json::json!({
            "state": state.as_str()
        }))?),
        ContentType::Xml => Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<jobInfo xmlns="{}">
  <state>{}</state>
</jobInfo>"#,
            ASYNC_API_NAMESPACE,
            state.as_str()
        )),
    }
}

// =============================================================================
// Decoding
// =============================================================================

fn xml_root(body: &str, expected: &str) -> Result<Value> {
    let (root, value) = xml::parse_document(body)?;
    if root != expected {
        return Err(Error::new(ErrorKind::Decode(format!(
            "expected <{}> document, got <{}>",
            expected, root
        ))));
    }
    Ok(value)
}

fn decode_info<T: DeserializeOwned>(content_type: ContentType, body: &str, root: &str) -> Result<T> {
    match content_type {
        ContentType::Json => Ok(serde_json::from_str(body)?),
        ContentType::Xml => Ok(serde_json::from_value(xml_root(body, root)?)?),
    }
}

/// Decode a `jobInfo` response.
pub fn decode_job(content_type: ContentType, body: &str) -> Result<Job> {
    decode_info(content_type, body, "jobInfo")
}

/// Decode a `batchInfo` response.
pub fn decode_batch(content_type: ContentType, body: &str) -> Result<Batch> {
    decode_info(content_type, body, "batchInfo")
}

/// Decode the list of result set ids of a batch.
pub fn decode_result_ids(content_type: ContentType, body: &str) -> Result<Vec<String>> {
    match content_type {
        ContentType::Json => Ok(serde_json::from_str(body)?),
        ContentType::Xml => {
            let doc = xml_root(body, "result-list")?;
            xml::as_list(doc.get("result").cloned().unwrap_or(Value::Null))
                .into_iter()
                .map(|id| match id {
                    Value::String(id) => Ok(id),
                    other => Err(Error::new(ErrorKind::Decode(format!(
                        "result id is not text: {}",
                        other
                    )))),
                })
                .collect()
        }
    }
}

/// Decode one result set into records.
pub fn decode_records(content_type: ContentType, body: &str) -> Result<Vec<Record>> {
    let items = match content_type {
        ContentType::Json => match serde_json::from_str::<Value>(body)? {
            Value::Array(items) => items,
            other => {
                return Err(Error::new(ErrorKind::Decode(format!(
                    "expected a JSON array of records, got {}",
                    json_kind(&other)
                ))))
            }
        },
        ContentType::Xml => {
            let doc = xml_root(body, "queryResult")?;
            xml::as_list(doc.get("records").cloned().unwrap_or(Value::Null))
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            other => Err(Error::new(ErrorKind::Decode(format!(
                "expected a record object, got {}",
                json_kind(&other)
            )))),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
