//! HTTP routes.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ProxyConfig;
use crate::error::Result;
use crate::export::{ExportRequest, Exporter};
use crate::responder::{json_array_body, parse_timestamp};

/// Response header naming how job polling ended.
pub const POLL_OUTCOME_HEADER: HeaderName = HeaderName::from_static("x-job-poll-outcome");

/// Shared state of every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub exporter: Arc<Exporter>,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let exporter = Exporter::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            exporter: Arc::new(exporter),
        })
    }
}

/// Build the proxy router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/{entity}", get(export_entity))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ExportParams {
    since: Option<String>,
}

/// `GET /{entity}?since=...`
///
/// Streams every record of the entity as a JSON array.
async fn export_entity(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(params): Query<ExportParams>,
) -> Result<Response> {
    let mut request = ExportRequest::new(entity);
    if let Some(raw) = params.since.as_deref().filter(|raw| !raw.is_empty()) {
        let raw = restore_offset_sign(raw);
        let raw = raw.as_str();
        match parse_timestamp(raw) {
            Ok(since) => request = request.with_since(since),
            Err(err) => warn!(since = raw, error = %err, "Ignoring unparsable since"),
        }
    }
    info!(entity = %request.entity, since = ?request.since, "Export requested");

    // Dropping this handler before polling ends (client disconnect) trips
    // the token.
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let export = state.exporter.clone().start(request, cancel).await?;
    guard.disarm();

    let outcome = HeaderValue::from_static(export.outcome().as_str());
    let body = Body::from_stream(json_array_body(export.into_records()));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (POLL_OUTCOME_HEADER, outcome),
        ],
        body,
    )
        .into_response())
}

/// Undo the `+` to space decoding of a query string in a UTC offset.
///
/// `2023-11-14T22:13:20.000+0000` sent unescaped arrives as
/// `2023-11-14T22:13:20.000 0000`; `+00:00` likewise arrives as ` 00:00`.
fn restore_offset_sign(raw: &str) -> String {
    if let Some((stamp, offset)) = raw.rsplit_once(' ') {
        let bytes = offset.as_bytes();
        let is_offset = match bytes.len() {
            4 => bytes.iter().all(u8::is_ascii_digit),
            5 => {
                bytes[2] == b':'
                    && bytes[..2].iter().all(u8::is_ascii_digit)
                    && bytes[3..].iter().all(u8::is_ascii_digit)
            }
            _ => false,
        };
        if is_offset && !stamp.is_empty() {
            return format!("{}+{}", stamp, offset);
        }
    }
    raw.to_string()
}
