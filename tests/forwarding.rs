//! Forwarded requests reach the backend unchanged, and responses come back unchanged.

mod common;

use common::mock_backend::{MockBackend, MockResponse};
use reqwest::Client;

#[tokio::test]
async fn test_method_query_and_body_round_trip() {
    let legacy = MockBackend::start("monolith").await;
    let config = common::test_config(
        &legacy.base_url(),
        &common::dead_url(),
        &common::dead_url(),
        "true",
        "0",
    );
    let proxy = common::start_proxy(config).await;

    let body = vec![0u8, 1, 2, 255, b'{', b'}', 10];
    let resp = Client::new()
        .put(proxy.url("/api/users/7?expand=true&tag=a%20b&tag=c"))
        .header("x-test-header", "test-value")
        .header("content-type", "application/octet-stream")
        .body(body.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let captured = legacy.captured_requests().await;
    assert_eq!(captured.len(), 1);
    let req = &captured[0];
    assert_eq!(req.method, "PUT");
    assert_eq!(req.path, "/api/users/7");
    assert_eq!(req.query.as_deref(), Some("expand=true&tag=a%20b&tag=c"));
    assert_eq!(req.body, body);
    assert_eq!(req.header("x-test-header"), Some("test-value"));
    assert_eq!(req.header("content-type"), Some("application/octet-stream"));
    assert_eq!(req.header("x-forwarded-for"), Some("127.0.0.1"));
    assert_eq!(req.header("host"), Some(legacy.addr.to_string().as_str()));
}

#[tokio::test]
async fn test_json_post_reaches_events_service() {
    let events = MockBackend::start("events").await;
    events
        .enqueue_response(MockResponse::json(r#"{"status":"success"}"#).with_header("x-event-id", "e-1"))
        .await;
    let config = common::test_config(
        &common::dead_url(),
        &common::dead_url(),
        &events.base_url(),
        "true",
        "0",
    );
    let proxy = common::start_proxy(config).await;

    let payload = r#"{"movie_id":1,"title":"Heat","action":"viewed","user_id":3}"#;
    let resp = Client::new()
        .post(proxy.url("/api/events/movie"))
        .header("content-type", "application/json")
        .body(payload)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("x-event-id").unwrap(), "e-1");
    assert_eq!(resp.text().await.unwrap(), r#"{"status":"success"}"#);

    let captured = events.captured_requests().await;
    assert_eq!(captured[0].method, "POST");
    assert_eq!(captured[0].body, payload.as_bytes());
}

#[tokio::test]
async fn test_backend_error_statuses_pass_through() {
    let legacy = MockBackend::start("monolith").await;
    legacy.enqueue_response(MockResponse::error(404, "not found")).await;
    legacy.enqueue_response(MockResponse::error(500, "boom")).await;
    let config = common::test_config(
        &legacy.base_url(),
        &common::dead_url(),
        &common::dead_url(),
        "true",
        "0",
    );
    let proxy = common::start_proxy(config).await;
    let client = Client::new();

    let resp = client.get(proxy.url("/api/users/999")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), r#"{"error": "not found"}"#);

    // Not retried, not rewritten.
    let resp = client.get(proxy.url("/api/payments")).send().await.unwrap();
    assert_eq!(resp.status(), 500);
    assert_eq!(legacy.captured_requests().await.len(), 2);
}

#[tokio::test]
async fn test_bodiless_get_is_forwarded_without_body() {
    let legacy = MockBackend::start("monolith").await;
    let config = common::test_config(
        &legacy.base_url(),
        &common::dead_url(),
        &common::dead_url(),
        "true",
        "0",
    );
    let proxy = common::start_proxy(config).await;

    let resp = Client::new().get(proxy.url("/api/users")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let captured = legacy.captured_requests().await;
    assert!(captured[0].body.is_empty());
    assert_eq!(captured[0].header("transfer-encoding"), None);
}
