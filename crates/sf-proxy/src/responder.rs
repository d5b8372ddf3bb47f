//! JSON array responder.
//!
//! Records are written as they arrive: `[`, then each record separated by
//! `,`, then `]`. Nothing already written is taken back, so a record that
//! fails mid-stream leaves a truncated array behind.

use std::io::Write;
use std::pin::Pin;

use busbar_sf_bulk::Record;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;

use crate::error::{Error, ErrorKind, Result};

/// Field normalized on every record.
pub const LAST_MODIFIED_DATE: &str = "LastModifiedDate";

/// Field holding the normalized timestamp.
pub const LAST_MODIFIED_DATE_FORMATTED: &str = "LastModifiedDateFormatted";

/// `2023-11-14T22:13:20.000+0000`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Parse a timestamp in [`TIMESTAMP_FORMAT`] or RFC 3339.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| {
            Error::with_source(
                ErrorKind::Responder(format!("unparsable timestamp '{}'", value)),
                err,
            )
        })
}

/// Canonical UTC rendering of a timestamp value.
///
/// Epoch milliseconds and timestamp strings are accepted. `Null` has no
/// rendering. Any other type is an error.
pub fn format_timestamp(value: &Value) -> Result<Option<String>> {
    let ts = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| {
                Error::new(ErrorKind::Responder(format!(
                    "epoch milliseconds out of range: {}",
                    n
                )))
            })?,
        Value::String(s) => parse_timestamp(s)?,
        other => {
            return Err(Error::new(ErrorKind::Responder(format!(
                "{} must be a number or a string, got {}",
                LAST_MODIFIED_DATE, other
            ))))
        }
    };
    Ok(Some(ts.format(TIMESTAMP_FORMAT).to_string()))
}

/// Add [`LAST_MODIFIED_DATE_FORMATTED`] to a record that has a
/// `LastModifiedDate`.
pub fn normalize_record(record: &mut Record) -> Result<()> {
    let formatted = match record.get(LAST_MODIFIED_DATE) {
        Some(value) => format_timestamp(value)?,
        None => None,
    };
    if let Some(formatted) = formatted {
        record.insert(
            LAST_MODIFIED_DATE_FORMATTED.to_string(),
            Value::String(formatted),
        );
    }
    Ok(())
}

/// Incremental JSON array writer.
#[derive(Debug)]
pub struct ResultWriter<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Open the array.
    pub fn begin(&mut self) -> Result<()> {
        self.out.write_all(b"[")?;
        Ok(())
    }

    /// Normalize and write one record.
    pub fn write_record(&mut self, mut record: Record) -> Result<()> {
        normalize_record(&mut record)?;
        if self.written > 0 {
            self.out.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.out, &record)?;
        self.written += 1;
        Ok(())
    }

    /// Close the array.
    pub fn finish(&mut self) -> Result<()> {
        self.out.write_all(b"]")?;
        self.out.flush()?;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl ResultWriter<Vec<u8>> {
    /// Hand out everything written since the last call.
    pub fn take_chunk(&mut self) -> Bytes {
        Bytes::from(std::mem::take(&mut self.out))
    }
}

/// Write every record of `records` into `out`.
///
/// Stops at the first failing record.
pub fn write_all<W, I>(out: W, records: I) -> Result<W>
where
    W: Write,
    I: IntoIterator<Item = Record>,
{
    let mut writer = ResultWriter::new(out);
    writer.begin()?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.finish()?;
    Ok(writer.into_inner())
}

enum Phase {
    Open,
    Records,
    Done,
}

struct BodyState<S> {
    records: Pin<Box<S>>,
    writer: ResultWriter<Vec<u8>>,
    phase: Phase,
}

/// Turn a record stream into response body chunks.
///
/// A failing record, or an error from `records`, is yielded once and ends
/// the stream; the HTTP body is cut short at that point.
pub fn json_array_body<S>(records: S) -> impl Stream<Item = Result<Bytes>> + Send
where
    S: Stream<Item = Result<Record>> + Send + 'static,
{
    let state = BodyState {
        records: Box::pin(records),
        writer: ResultWriter::new(Vec::new()),
        phase: Phase::Open,
    };

    stream::unfold(state, |mut state| async move {
        let step = match state.phase {
            Phase::Done => return None,
            Phase::Open => {
                state.phase = Phase::Records;
                state.writer.begin()
            }
            Phase::Records => match state.records.next().await {
                Some(Ok(record)) => state.writer.write_record(record),
                Some(Err(err)) => Err(err),
                None => {
                    state.phase = Phase::Done;
                    state.writer.finish()
                }
            },
        };

        match step {
            Ok(()) => {
                let chunk = state.writer.take_chunk();
                Some((Ok(chunk), state))
            }
            Err(err) => {
                tracing::warn!(
                    written = state.writer.written(),
                    error = %err,
                    "Aborting response body"
                );
                state.phase = Phase::Done;
                Some((Err(err), state))
            }
        }
    })
}
