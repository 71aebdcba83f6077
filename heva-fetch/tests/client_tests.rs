//! HTTP behavior of the API client against a mock server.

use std::time::Duration;

use heva_core::Envelope;
use heva_fetch::{ApiClient, ApiError, ApiRequest, ApiResponse, ClientConfig, RetryStrategy, UploadForm};
use heva_store::TokenManager;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, tokens: TokenManager) -> ApiClient {
    let config = ClientConfig::new(&server.uri()).unwrap();
    ApiClient::new(config, tokens).unwrap()
}

#[tokio::test]
async fn test_unauthenticated_get_scenario() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scoring/score/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "unauthenticated"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, TokenManager::in_memory());
    let err = client.get::<Value>("/scoring/score/").await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(
        err,
        ApiError::Api {
            status: 401,
            message: "unauthenticated".to_string(),
            details: None,
        }
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(requests[0].headers.get("content-type").unwrap(), "application/json");
}

#[tokio::test]
async fn test_success_returns_envelope_unchanged() {
    let server = MockServer::start().await;
    let body = json!({
        "success": true,
        "message": "Score computed",
        "data": {"score": 712, "band": "B+"},
        "generated_at": "2024-05-01"
    });
    Mock::given(method("GET"))
        .and(path("/scoring/score/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let client = client_for(&server, TokenManager::in_memory());
    let envelope = client
        .get::<Value>("/scoring/score/")
        .await
        .unwrap()
        .into_envelope()
        .unwrap();

    assert_eq!(serde_json::to_value(&envelope).unwrap(), body);
    assert_eq!(envelope.data, Some(json!({"score": 712, "band": "B+"})));
}

#[tokio::test]
async fn test_token_is_attached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .and(header("authorization", "Token h.p.s"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenManager::in_memory();
    tokens.set_token("h.p.s");
    let client = client_for(&server, tokens);

    let response = client.get::<Value>("/users/me/").await.unwrap();
    assert!(response.as_envelope().unwrap().success);
}

#[tokio::test]
async fn test_extra_headers_override_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/import/"))
        .and(header("content-type", "text/csv"))
        .and(header("authorization", "Bearer override"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenManager::in_memory();
    tokens.set_token("a.b.c");
    let client = client_for(&server, tokens);

    let req = ApiRequest::post("/import/")
        .body(json!("x,y"))
        .header("Content-Type", "text/csv")
        .header("Authorization", "Bearer override");
    client.request::<Value>(&req).await.unwrap();
}

#[tokio::test]
async fn test_json_body_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/profile/"))
        .and(body_json(json!({"sector": "design", "employees": 4})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {"id": 9}})))
        .expect(1)
        .mount(&server)
        .await;

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Created {
        id: u32,
    }

    let client = client_for(&server, TokenManager::in_memory());
    let envelope: Envelope<Created> = client
        .patch("/profile/", &json!({"sector": "design", "employees": 4}))
        .await
        .unwrap()
        .into_envelope()
        .unwrap();
    assert_eq!(envelope.data, Some(Created { id: 9 }));
}

#[tokio::test]
async fn test_text_response_is_returned_raw() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = client_for(&server, TokenManager::in_memory());
    let response = client.get::<Value>("/health/").await.unwrap();
    assert_eq!(response, ApiResponse::Text("ok".to_string()));
}

#[tokio::test]
async fn test_error_details_and_fallback_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/documents/3/"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "success": false,
            "message": "Document in review",
            "details": "review #12 pending"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let client = client_for(&server, TokenManager::in_memory());

    let err = client.delete::<Value>("/documents/3/").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Api {
            status: 409,
            message: "Document in review".to_string(),
            details: Some("review #12 pending".to_string()),
        }
    );

    let err = client.get::<Value>("/broken/").await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 500");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_timeout_discards_late_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": "late"}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::new(&server.uri())
        .unwrap()
        .with_timeout(Duration::from_millis(100));
    let client = ApiClient::new(config, TokenManager::in_memory()).unwrap();

    let result = client.get::<Value>("/slow/").await;
    assert_eq!(result, Err(ApiError::Timeout(Duration::from_millis(100))));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Port 9 (discard) on localhost is closed in test environments.
    let config = ClientConfig::new("http://127.0.0.1:9").unwrap();
    let client = ApiClient::new(config, TokenManager::in_memory()).unwrap();

    let err = client.get::<Value>("/anything/").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_upload_sends_multipart_without_json_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents/upload/"))
        .and(header("authorization", "Token a.b.c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {"id": 1}})))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenManager::in_memory();
    tokens.set_token("a.b.c");
    let client = client_for(&server, tokens);

    let form = UploadForm::new()
        .text("kind", "invoice")
        .file("document", "facture.pdf", b"%PDF-1.4 test".to_vec());
    let envelope: Envelope<Value> = client.upload("/documents/upload/", &form).await.unwrap();
    assert_eq!(envelope.data, Some(json!({"id": 1})));

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="), "{content_type}");
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("facture.pdf"));
    assert!(body.contains("invoice"));
}

#[tokio::test]
async fn test_upload_rejects_non_json_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents/upload/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
        .mount(&server)
        .await;

    let client = client_for(&server, TokenManager::in_memory());
    let result: Result<Envelope<Value>, _> = client.upload("/documents/upload/", &UploadForm::new()).await;
    assert!(matches!(result, Err(ApiError::Unknown(_))));
}

#[tokio::test]
async fn test_retry_recovers_idempotent_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scoring/history/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scoring/history/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
        .mount(&server)
        .await;

    let client = client_for(&server, TokenManager::in_memory());
    let strategy = RetryStrategy::new(3).with_base_delay(Duration::from_millis(10));

    let response = client
        .request_with_retry::<Value>(&ApiRequest::get("/scoring/history/"), &strategy)
        .await
        .unwrap();
    assert!(response.as_envelope().unwrap().success);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_post_is_not_retried_without_opt_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/applications/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server, TokenManager::in_memory());
    let strategy = RetryStrategy::new(3).with_base_delay(Duration::from_millis(10));

    let err = client
        .request_with_retry::<Value>(&ApiRequest::post("/applications/").body(json!({})), &strategy)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    let err = client
        .request_with_retry::<Value>(
            &ApiRequest::post("/applications/").body(json!({})).retry_safe(true),
            &strategy,
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(server.received_requests().await.unwrap().len(), 1 + 4);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .mount(&server)
        .await;

    let client = client_for(&server, TokenManager::in_memory());
    let strategy = RetryStrategy::new(3).with_base_delay(Duration::from_millis(10));

    let err = client
        .request_with_retry::<Value>(&ApiRequest::get("/missing/"), &strategy)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "not found");
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
