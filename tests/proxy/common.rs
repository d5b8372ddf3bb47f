use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use busbar_sf_auth::LoginCredentials;
use busbar_sf_client::Endpoints;
use busbar_sf_proxy::{router, AppState, ProxyConfig};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN_PATH: &str = "/services/Soap/u/44.0";
pub const DESCRIBE_PATH: &str = "/services/data/v44.0/sobjects/Contact/describe";
pub const JOBS_PATH: &str = "/services/async/44.0/job";
pub const JOB_PATH: &str = "/services/async/44.0/job/750x";
pub const BATCH_PATH: &str = "/services/async/44.0/job/750x/batch";
pub const RESULT_IDS_PATH: &str = "/services/async/44.0/job/750x/batch/751x/result";
pub const RESULT_PATH: &str = "/services/async/44.0/job/750x/batch/751x/result/752x";

pub const LOGIN_SUCCESS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns="urn:partner.soap.sforce.com">
  <soapenv:Body>
    <loginResponse>
      <result>
        <passwordExpired>false</passwordExpired>
        <sandbox>false</sandbox>
        <serverUrl>https://na123.salesforce.com/services/Soap/u/44.0/00Dxx0000001gPL</serverUrl>
        <sessionId>00Dxx0000001gPL!AQ4AQFakeSession</sessionId>
        <userId>005xx000001Sv6AAAS</userId>
      </result>
    </loginResponse>
  </soapenv:Body>
</soapenv:Envelope>"#;

pub const LOGIN_FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <soapenv:Fault>
      <faultcode>sf:INVALID_LOGIN</faultcode>
      <faultstring>INVALID_LOGIN: Invalid username, password, security token; or user locked out.</faultstring>
    </soapenv:Fault>
  </soapenv:Body>
</soapenv:Envelope>"#;

/// Proxy configuration pointed at the mock org, polling every 10ms.
pub fn proxy_config(server: &MockServer) -> ProxyConfig {
    ProxyConfig::new(LoginCredentials::new("user@example.com", "secret"))
        .with_endpoints(Endpoints::fixed(server.uri()).unwrap())
        .with_poll_interval(Duration::from_millis(10))
        .with_poll_ceiling(Duration::from_secs(5))
}

pub fn job_json(state: &str, completed: i64, failed: i64) -> Value {
    json!({
        "id": "750x",
        "operation": "query",
        "object": "Contact",
        "contentType": "JSON",
        "state": state,
        "numberBatchesTotal": 1,
        "numberBatchesQueued": 0,
        "numberBatchesInProgress": 1 - completed - failed,
        "numberBatchesCompleted": completed,
        "numberBatchesFailed": failed
    })
}

pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_SUCCESS))
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mount_describe(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(DESCRIBE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Contact",
            "fields": [
                {"name": "Id", "type": "id"},
                {"name": "LastName", "type": "string"},
                {"name": "MailingAddress", "type": "address"},
                {"name": "LastModifiedDate", "type": "datetime"}
            ]
        })))
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mount_create_job(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(JOBS_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(job_json("Open", 0, 0)))
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mount_close_job(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(JOB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json("Closed", 1, 0)))
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mount_results(server: &MockServer, records: Value) {
    Mock::given(method("GET"))
        .and(path(RESULT_IDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["752x"])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(RESULT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(records))
        .mount(server)
        .await;
}

pub fn batch_json() -> Value {
    json!({"id": "751x", "jobId": "750x", "state": "Queued"})
}

/// Send `GET uri` through the proxy router and collect the whole response.
pub async fn get(config: ProxyConfig, uri: &str) -> (StatusCode, HeaderMap, String) {
    let app = router(AppState::new(config).unwrap());
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}
