// ABOUTME: End-to-end tests driving the axum rate limit middleware
// ABOUTME: Covers the full anonymous scenario: cookie issuance, header contract, and 429 shaping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(missing_docs)]

mod common;

use axum::body::Body;
use axum::routing::post;
use axum::Router;
use common::init_test_logging;
use http::{Request, StatusCode};
use quotagate::auth::NoSubscriptionProvider;
use quotagate::counter::memory::InMemoryCounter;
use quotagate::middleware::rate_limit_middleware;
use quotagate::rate_limiting::RateLimitEngine;
use std::sync::Arc;
use tower::util::ServiceExt;

fn app() -> Router {
    init_test_logging();
    let engine = Arc::new(RateLimitEngine::new(
        Arc::new(common::StaticSessionProvider(None)),
        Arc::new(NoSubscriptionProvider),
        Some(Arc::new(InMemoryCounter::new(256))),
    ));

    Router::new()
        .route("/api/chat", post(|| async { "ok" }))
        .route_layer(axum::middleware::from_fn_with_state(
            engine,
            rate_limit_middleware,
        ))
}

fn chat_request(guest_cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("x-forwarded-for", "203.0.113.9")
        .header("user-agent", "TestAgent/1.0");
    if let Some(guest_id) = guest_cookie {
        builder = builder.header("cookie", format!("guest_id={guest_id}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn header<'a>(response: &'a http::Response<Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_anonymous_caller_end_to_end() {
    let app = app();

    // First request: guest cookie issued, one of five consumed.
    let response = app.clone().oneshot(chat_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "X-RateLimit-Limit"), "5");
    assert_eq!(header(&response, "X-RateLimit-Remaining"), "4");

    let set_cookie = header(&response, "set-cookie").to_owned();
    assert!(set_cookie.starts_with("guest_id="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Max-Age=2592000"));

    let guest_id = set_cookie
        .trim_start_matches("guest_id=")
        .split(';')
        .next()
        .unwrap()
        .to_owned();

    // Requests two through five stay within budget under the issued cookie.
    for expected_remaining in (0..=3).rev() {
        let response = app
            .clone()
            .oneshot(chat_request(Some(&guest_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header(&response, "X-RateLimit-Remaining"),
            expected_remaining.to_string()
        );
        // Cookie already present, so no re-issuance.
        assert!(response.headers().get("set-cookie").is_none());
    }

    // Sixth request from the same identity is rejected.
    let response = app
        .clone()
        .oneshot(chat_request(Some(&guest_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, "X-RateLimit-Remaining"), "0");
    assert!(!header(&response, "Retry-After").is_empty());

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "RATE_LIMIT_EXCEEDED");
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("Anonymous"));
    assert!(message.contains('5'));
}

#[tokio::test]
async fn test_without_cookie_each_browser_gets_a_fresh_identity() {
    let app = app();

    // No cookie round-tripping: every request gets a fresh guest id, so the
    // per-identity limit never trips even past five calls.
    for _ in 0..7 {
        let response = app.clone().oneshot(chat_request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(header(&response, "set-cookie").starts_with("guest_id="));
    }
}

#[tokio::test]
async fn test_success_responses_carry_budget_headers() {
    let app = app();
    let response = app.clone().oneshot(chat_request(Some("g1"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "X-RateLimit-Limit"), "5");
    assert_eq!(header(&response, "X-RateLimit-Remaining"), "4");
    assert!(!header(&response, "X-RateLimit-Reset").is_empty());
}
