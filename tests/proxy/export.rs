use std::time::Duration;

use axum::http::{header, StatusCode};
use serde_json::{json, Value};
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::*;

#[tokio::test]
async fn test_exports_entity_as_json_array() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_describe(&server).await;
    mount_create_job(&server).await;

    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .and(body_string(
            "SELECT Id, LastName, LastModifiedDate FROM Contact \
             WHERE LastModifiedDate > 2023-11-14T22:13:20Z",
        ))
        .respond_with(ResponseTemplate::new(201).set_body_json(batch_json()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(JOB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("Open", 1, 0)))
        .expect(1)
        .mount(&server)
        .await;

    mount_results(
        &server,
        json!([
            {"Id": "003A", "LastName": "Lovelace", "LastModifiedDate": 1700000000000i64},
            {"Id": "003B", "LastName": "Hopper", "LastModifiedDate": "2023-11-15T00:13:20.000+0200"}
        ]),
    )
    .await;
    mount_close_job(&server).await;

    let (status, headers, body) = get(
        proxy_config(&server),
        "/Contact?since=2023-11-14T22%3A13%3A20.000%2B0000",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(headers["x-job-poll-outcome"], "completed");

    let records: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        records,
        json!([
            {
                "Id": "003A",
                "LastName": "Lovelace",
                "LastModifiedDate": 1700000000000i64,
                "LastModifiedDateFormatted": "2023-11-14T22:13:20.000+0000"
            },
            {
                "Id": "003B",
                "LastName": "Hopper",
                "LastModifiedDate": "2023-11-15T00:13:20.000+0200",
                "LastModifiedDateFormatted": "2023-11-14T22:13:20.000+0000"
            }
        ])
    );
}

#[tokio::test]
async fn test_get_contact_returns_both_records() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_describe(&server).await;
    mount_create_job(&server).await;

    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(batch_json()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(JOB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("Open", 1, 0)))
        .mount(&server)
        .await;

    mount_results(
        &server,
        json!([{"Id": "1", "Name": "A"}, {"Id": "2", "Name": "B"}]),
    )
    .await;
    mount_close_job(&server).await;

    let (status, _, body) = get(proxy_config(&server), "/Contact").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"[{"Id":"1","Name":"A"},{"Id":"2","Name":"B"}]"#);
}

#[tokio::test]
async fn test_since_with_unescaped_plus_offset_filters_batch() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_describe(&server).await;
    mount_create_job(&server).await;

    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .and(body_string(
            "SELECT Id, LastName, LastModifiedDate FROM Contact \
             WHERE LastModifiedDate > 2023-11-14T22:13:20Z",
        ))
        .respond_with(ResponseTemplate::new(201).set_body_json(batch_json()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(JOB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("Open", 1, 0)))
        .mount(&server)
        .await;

    mount_results(&server, json!([])).await;
    mount_close_job(&server).await;

    let (status, _, body) = get(
        proxy_config(&server),
        "/Contact?since=2023-11-14T22:13:20.000+0000",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn test_unparsable_since_is_ignored() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_describe(&server).await;
    mount_create_job(&server).await;

    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .and(body_string("SELECT Id, LastName, LastModifiedDate FROM Contact"))
        .respond_with(ResponseTemplate::new(201).set_body_json(batch_json()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(JOB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("Open", 1, 0)))
        .mount(&server)
        .await;

    mount_results(&server, json!([])).await;
    mount_close_job(&server).await;

    let (status, _, body) = get(proxy_config(&server), "/Contact?since=yesterday").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn test_login_fault_is_500_and_creates_no_job() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string(LOGIN_FAULT))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(DESCRIBE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(JOBS_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let (status, headers, body) = get(proxy_config(&server), "/Contact").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
    assert!(body.contains("INVALID_LOGIN"), "body: {body}");
}

#[tokio::test]
async fn test_batch_failure_still_closes_job() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_describe(&server).await;
    mount_create_job(&server).await;

    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "exceptionCode": "InvalidBatch",
            "exceptionMessage": "Failed to process query"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(JOB_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    mount_close_job(&server).await;

    let (status, _, body) = get(proxy_config(&server), "/Contact").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("400"), "body: {body}");
    assert!(body.contains("InvalidBatch"), "body: {body}");
}

#[tokio::test]
async fn test_failed_job_is_closed_and_reported() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_describe(&server).await;
    mount_create_job(&server).await;

    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(batch_json()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(JOB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("Open", 0, 1)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(RESULT_IDS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    mount_close_job(&server).await;

    let (status, _, body) = get(proxy_config(&server), "/Contact").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Job 750x failed in state Open");
}

#[tokio::test]
async fn test_poll_timeout_still_returns_results() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_describe(&server).await;
    mount_create_job(&server).await;

    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(batch_json()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(JOB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("Open", 0, 0)))
        .mount(&server)
        .await;

    mount_results(&server, json!([{"Id": "003A", "LastModifiedDate": null}])).await;
    mount_close_job(&server).await;

    let config = proxy_config(&server).with_poll_ceiling(Duration::from_millis(50));
    let (status, headers, body) = get(config, "/Contact").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-job-poll-outcome"], "timed-out");
    assert_eq!(body, r#"[{"Id":"003A","LastModifiedDate":null}]"#);
}

#[tokio::test]
async fn test_unsafe_entity_name_is_rejected_before_job_creation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_SUCCESS))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(JOBS_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let (status, _, body) = get(proxy_config(&server), "/Contact%3BDROP").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Contact;DROP"), "body: {body}");
}

#[tokio::test]
async fn test_cancelled_export_closes_job() {
    use std::sync::Arc;

    use busbar_sf_proxy::{ErrorKind, ExportRequest, Exporter};
    use tokio_util::sync::CancellationToken;

    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_describe(&server).await;
    mount_create_job(&server).await;

    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(batch_json()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(JOB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("Open", 0, 0)))
        .expect(0)
        .mount(&server)
        .await;

    mount_close_job(&server).await;

    let exporter = Arc::new(Exporter::new(&proxy_config(&server)).unwrap());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = exporter
        .start(ExportRequest::new("Contact"), cancel)
        .await
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Cancelled));
}
