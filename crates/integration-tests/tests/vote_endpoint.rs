//! HTTP contract of `/api/vote` against a live in-memory server.

use lovevote_integration_tests::TestServer;
use reqwest::{Client, Method, StatusCode, header};
use serde_json::{Value, json};

async fn call(server: &TestServer, method: Method, query: &str) -> (StatusCode, Value) {
    let resp = Client::new()
        .request(method, server.url(&format!("/api/vote{query}")))
        .send()
        .await
        .expect("Request failed");
    let status = resp.status();
    let body = resp.json().await.expect("Response was not JSON");
    (status, body)
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_empty_table_snapshot() {
    let server = TestServer::memory().await;
    let (status, body) = call(&server, Method::GET, "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_love_then_unlove() {
    let server = TestServer::memory().await;

    let (_, body) = call(&server, Method::POST, "?itemId=abc&userId=u1").await;
    assert_eq!(body, json!({"loved": true}));
    let (_, body) = call(&server, Method::GET, "?itemId=abc").await;
    assert_eq!(body, json!({"count": 1, "loved": false}));
    let (_, body) = call(&server, Method::GET, "?itemId=abc&userId=u1").await;
    assert_eq!(body, json!({"count": 1, "loved": true}));

    let (_, body) = call(&server, Method::POST, "?itemId=abc&userId=u1").await;
    assert_eq!(body, json!({"loved": false}));
    let (_, body) = call(&server, Method::GET, "?itemId=abc").await;
    assert_eq!(body, json!({"count": 0, "loved": false}));
}

#[tokio::test]
async fn test_missing_item_id_is_bad_request() {
    let server = TestServer::memory().await;
    let (status, body) = call(&server, Method::POST, "?userId=u1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Missing itemId"}));
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_aggregate_counts_distinct_lovers() {
    let server = TestServer::memory().await;
    for user in ["u1", "u2", "u3"] {
        call(&server, Method::POST, &format!("?itemId=a&userId={user}")).await;
    }
    call(&server, Method::POST, "?itemId=b&userId=u1").await;
    call(&server, Method::POST, "?itemId=c&userId=u2").await;
    call(&server, Method::POST, "?itemId=c&userId=u2").await;

    let (_, body) = call(&server, Method::GET, "?userId=u2").await;
    assert_eq!(
        body,
        json!({
            "a": {"count": 3, "loved": true},
            "b": {"count": 1, "loved": false}
        })
    );
}

#[tokio::test]
async fn test_reads_are_idempotent() {
    let server = TestServer::memory().await;
    call(&server, Method::POST, "?itemId=a&userId=u1").await;

    let first = call(&server, Method::GET, "?userId=u1").await;
    let second = call(&server, Method::GET, "?userId=u1").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_batch_read() {
    let server = TestServer::memory().await;
    call(&server, Method::POST, "?itemId=a&userId=u1").await;

    let (status, body) = call(&server, Method::GET, "?itemIds=a,zzz&userId=u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "a": {"count": 1, "loved": true},
            "zzz": {"count": 0, "loved": false}
        })
    );
}

// ============================================================================
// Transport details
// ============================================================================

#[tokio::test]
async fn test_other_methods_are_rejected() {
    let server = TestServer::memory().await;
    let resp = Client::new()
        .delete(server.url("/api/vote?itemId=a&userId=u1"))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        resp.headers().get(header::ALLOW).and_then(|v| v.to_str().ok()),
        Some("GET, HEAD, POST")
    );
    assert_eq!(resp.text().await.expect("No body"), "Method not allowed");
}

#[tokio::test]
async fn test_vote_responses_are_not_cached() {
    let server = TestServer::memory().await;
    let resp = Client::new()
        .get(server.url("/api/vote"))
        .header("x-request-id", "it-123")
        .send()
        .await
        .expect("Request failed");

    let headers = resp.headers();
    assert_eq!(
        headers.get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()),
        Some("no-store")
    );
    assert_eq!(
        headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    assert_eq!(
        headers.get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("it-123")
    );
}

#[tokio::test]
async fn test_unbound_store_fails_every_vote_request() {
    let server = TestServer::spawn(None).await;

    let (status, body) = call(&server, Method::POST, "?userId=u1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Database binding missing");

    let resp = Client::new()
        .get(server.url("/health/ready"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let resp = Client::new()
        .get(server.url("/health"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}
