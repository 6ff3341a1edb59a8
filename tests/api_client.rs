use std::sync::Arc;
use std::time::Duration;

use secrecy::Secret;
use serde_json::json;
use tkscan::config::Config;
use tkscan::models::{ScanResult, ScanStatus};
use tkscan::services::api_client::{
    ApiClient, CONFIRM_TIMEOUT_MESSAGE, LOGIN_TIMEOUT_MESSAGE, SCAN_TIMEOUT_MESSAGE,
};
use tkscan::services::credential_store::{CredentialStore, MemoryStore, AUTH_TOKEN_KEY};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, store: Arc<MemoryStore>) -> ApiClient {
    ApiClient::new(&Config::new(server.uri()), store).unwrap()
}

fn fast_timeout_client(server: &MockServer, store: Arc<MemoryStore>) -> ApiClient {
    let mut config = Config::new(server.uri());
    config.request_timeout_secs = 1;
    ApiClient::new(&config, store).unwrap()
}

fn logged_in_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.set(AUTH_TOKEN_KEY, "t1").unwrap();
    store
}

fn password(value: &str) -> Secret<String> {
    Secret::new(value.to_string())
}

#[tokio::test]
async fn login_success_returns_token_and_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "a@b.com", "password": "x" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "token": "t1",
            "user": { "id": "u1", "name": "Vol", "email": "a@b.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, Arc::new(MemoryStore::new()));
    let response = api.login("a@b.com", &password("x")).await;

    assert!(response.success);
    assert_eq!(response.token.as_deref(), Some("t1"));
    assert_eq!(response.user.unwrap().id, "u1");
}

#[tokio::test]
async fn login_is_sent_without_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let api = client(&server, logged_in_store());
    api.login("a@b.com", &password("x")).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn login_error_body_message_is_surfaced_exactly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid email or password" })),
        )
        .mount(&server)
        .await;

    let response = client(&server, Arc::new(MemoryStore::new()))
        .login("a@b.com", &password("wrong"))
        .await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Invalid email or password"));
}

#[tokio::test]
async fn login_non_json_error_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let response = client(&server, Arc::new(MemoryStore::new()))
        .login("a@b.com", &password("x"))
        .await;

    assert_eq!(response.error.as_deref(), Some("Server error: 500"));
}

#[tokio::test]
async fn login_connection_failure_is_reported() {
    // Nothing listens on the discard port
    let api = ApiClient::new(
        &Config::new("http://127.0.0.1:9"),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let response = api.login("a@b.com", &password("x")).await;
    assert!(!response.success);
    assert!(response
        .error
        .unwrap()
        .starts_with("Connection failed: "));
}

#[tokio::test]
async fn login_timeout_yields_timeout_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "token": "t1" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let response = fast_timeout_client(&server, Arc::new(MemoryStore::new()))
        .login("a@b.com", &password("x"))
        .await;

    assert!(!response.success);
    assert!(response.token.is_none());
    assert_eq!(response.error.as_deref(), Some(LOGIN_TIMEOUT_MESSAGE));
}

#[tokio::test]
async fn scan_raw_payload_request_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scan"))
        .and(header("authorization", "Bearer t1"))
        .and(header("content-type", "application/json"))
        .and(header("user-agent", "TKScannerApp/1.0"))
        .and(header("bypass-tunnel-reminder", "true"))
        .and(body_json(json!({
            "passId": "RAW123",
            "userId": "",
            "passType": "",
            "token": "",
            "scannerId": "u1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "valid",
            "student": { "name": "Asha", "passType": "Day", "amountPaid": 300, "_id": "doc-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server, logged_in_store()).scan("RAW123", "u1").await;

    let ScanResult::Valid(student) = result else {
        panic!("expected a valid ticket");
    };
    assert_eq!(student.name, "Asha");
    assert_eq!(student.id.as_deref(), Some("doc-1"));
}

#[tokio::test]
async fn scan_json_payload_fields_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scan"))
        .and(body_json(json!({
            "passId": "P-42",
            "userId": "U-7",
            "passType": "VIP",
            "token": "sig",
            "scannerId": "unknown_device"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "duplicate",
            "student": {
                "name": "Ravi",
                "passType": "VIP",
                "amountPaid": 900,
                "firstCheckInTime": "2026-03-01T09:00:00Z"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = r#"{"passId":"P-42","userId":"U-7","passType":"VIP","token":"sig"}"#;
    let result = client(&server, logged_in_store())
        .scan(payload, "unknown_device")
        .await;

    assert_eq!(result.status(), ScanStatus::Duplicate);
}

#[tokio::test]
async fn scan_without_token_is_sent_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scan"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "invalid", "error": "Unauthorized scanner" })),
        )
        .mount(&server)
        .await;

    let result = client(&server, Arc::new(MemoryStore::new()))
        .scan("RAW123", "u1")
        .await;

    assert_eq!(result, ScanResult::invalid("Unauthorized scanner"));
    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn scan_error_status_with_structured_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scan"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": "invalid",
            "error": "Ticket not found"
        })))
        .mount(&server)
        .await;

    let result = client(&server, logged_in_store()).scan("RAW123", "u1").await;
    assert_eq!(result, ScanResult::invalid("Ticket not found"));
}

#[tokio::test]
async fn scan_error_status_without_structured_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scan"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "down" })))
        .mount(&server)
        .await;

    let result = client(&server, logged_in_store()).scan("RAW123", "u1").await;
    assert_eq!(result, ScanResult::invalid("Server error (503)"));
}

#[tokio::test]
async fn scan_malformed_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scan"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy page</html>"))
        .mount(&server)
        .await;

    let result = client(&server, logged_in_store()).scan("RAW123", "u1").await;
    let ScanResult::Invalid { error } = result else {
        panic!("expected invalid");
    };
    assert!(error.starts_with("Malformed server response"));
}

#[tokio::test]
async fn scan_timeout_yields_timeout_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scan"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "invalid" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let result = fast_timeout_client(&server, logged_in_store())
        .scan("RAW123", "u1")
        .await;
    assert_eq!(result, ScanResult::invalid(SCAN_TIMEOUT_MESSAGE));
}

#[tokio::test]
async fn scan_network_failure() {
    let api = ApiClient::new(&Config::new("http://127.0.0.1:9"), logged_in_store()).unwrap();

    let ScanResult::Invalid { error } = api.scan("RAW123", "u1").await else {
        panic!("expected invalid");
    };
    assert!(error.starts_with("Network error: "));
}

#[tokio::test]
async fn confirm_whole_ticket_omits_member_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scan/confirm"))
        .and(header("authorization", "Bearer t1"))
        .and(body_json(json!({ "passId": "doc-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, logged_in_store())
        .confirm_check_in("doc-1", None)
        .await;
    assert!(response.success);
}

#[tokio::test]
async fn confirm_member_sends_member_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scan/confirm"))
        .and(body_json(json!({ "passId": "doc-1", "memberId": "m2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, logged_in_store())
        .confirm_check_in("doc-1", Some("m2"))
        .await;
    assert!(response.success);
}

#[tokio::test]
async fn confirm_error_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scan/confirm"))
        .and(body_json(json!({ "passId": "known" })))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "error": "Already checked in" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/scan/confirm"))
        .and(body_json(json!({ "passId": "opaque" })))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let api = client(&server, logged_in_store());

    let response = api.confirm_check_in("known", None).await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Already checked in"));

    let response = api.confirm_check_in("opaque", None).await;
    assert_eq!(response.error.as_deref(), Some("Confirmation failed"));
}

#[tokio::test]
async fn confirm_timeout_yields_request_timed_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scan/confirm"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let response = fast_timeout_client(&server, logged_in_store())
        .confirm_check_in("doc-1", None)
        .await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some(CONFIRM_TIMEOUT_MESSAGE));
    assert_eq!(CONFIRM_TIMEOUT_MESSAGE, "Request timed out");
}

#[tokio::test]
async fn confirm_network_failure() {
    let api = ApiClient::new(&Config::new("http://127.0.0.1:9"), logged_in_store()).unwrap();

    let response = api.confirm_check_in("doc-1", None).await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Network error"));
}
