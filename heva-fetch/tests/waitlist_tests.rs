//! Waitlist client against a mock server.

use heva_fetch::{ApiError, ClientConfig, WaitlistClient};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> WaitlistClient {
    let config = ClientConfig::default()
        .with_waitlist_url(&server.uri())
        .unwrap();
    WaitlistClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_join() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/waitlist/join"))
        .and(body_json(json!({"email": "ada@studio.fr", "name": "Ada"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": {"email": "ada@studio.fr", "position": 128}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entry = client(&server).join("ada@studio.fr", Some("Ada")).await.unwrap();
    assert_eq!(entry.email, "ada@studio.fr");
    assert_eq!(entry.name.as_deref(), Some("Ada"));
    assert_eq!(entry.position, Some(128));
}

#[tokio::test]
async fn test_join_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/waitlist/join"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"error": "already registered"})))
        .mount(&server)
        .await;

    let err = client(&server).join("ada@studio.fr", None).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Api {
            status: 409,
            message: "already registered".to_string(),
            details: None,
        }
    );
}

#[tokio::test]
async fn test_count_shapes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/waitlist/count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {"count": 57}})))
        .mount(&server)
        .await;

    assert_eq!(client(&server).count().await.unwrap().count, 57);
}

#[tokio::test]
async fn test_count_unrecognized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/waitlist/count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"people": "lots"})))
        .mount(&server)
        .await;

    assert!(matches!(client(&server).count().await, Err(ApiError::Unknown(_))));
}

#[tokio::test]
async fn test_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/waitlist/check/ada@studio.fr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"exists": true})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/waitlist/check/bob@studio.fr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"exists": false})))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.check("ada@studio.fr").await.unwrap().on_waitlist);
    assert!(!client.check("bob@studio.fr").await.unwrap().on_waitlist);
}
