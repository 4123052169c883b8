//! Router behaviour that needs no database.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use bazaar_integration_tests::{offline_pool, spawn_admin, spawn_storefront};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_health_endpoints() {
    let storefront = spawn_storefront(offline_pool()).await;
    let admin = spawn_admin(offline_pool()).await;

    for server in [&storefront, &admin] {
        let resp = server.client.get(server.url("/health")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.text().await.unwrap(), "ok");
    }
}

#[tokio::test]
async fn test_responses_carry_security_headers_and_request_id() {
    let server = spawn_storefront(offline_pool()).await;
    let resp = server.client.get(server.url("/health")).send().await.unwrap();

    let headers = resp.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_orders_and_checkout_require_sign_in() {
    let server = spawn_storefront(offline_pool()).await;

    let resp = server.client.get(server.url("/orders")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .client
        .post(server.url("/checkout"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_new_visitor_has_empty_cart() {
    let server = spawn_storefront(offline_pool()).await;
    let body: Value = server
        .client
        .get(server.url("/cart/count"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "count": 0 }));
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let server = spawn_storefront(offline_pool()).await;
    let resp = server
        .client
        .post(server.url("/cart/add"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_admin_rejects_anonymous_requests() {
    let server = spawn_admin(offline_pool()).await;

    let resp = server.client.get(server.url("/orders")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Sign in required" }));

    let resp = server
        .client
        .post(server.url("/categories"))
        .json(&json!({ "name": "Mugs" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
