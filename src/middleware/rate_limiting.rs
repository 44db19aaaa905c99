// ABOUTME: Rate limiting middleware for HTTP requests
// ABOUTME: Enforces request rate limits and attaches standard quota headers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

//! # Rate Limiting Middleware with HTTP Headers
//!
//! Runs the decision engine for every request, rejects over-quota callers
//! with a 429 and standard headers, and attaches the same headers to
//! successful responses so clients can budget ahead of time. A freshly
//! issued guest id is persisted here via `Set-Cookie`; the engine itself
//! never touches the response.

use crate::errors::{AppError, ErrorCode, ErrorResponse};
use crate::rate_limiting::{RateLimitEngine, RateLimitResult};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, HeaderValue, StatusCode};
use std::sync::Arc;

/// HTTP header names for rate limiting
pub mod headers {
    /// HTTP header name for maximum requests allowed in the current window
    pub const X_RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
    /// HTTP header name for remaining requests in the current window
    pub const X_RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
    /// HTTP header name for Unix timestamp when the rate limit resets
    pub const X_RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";
    /// HTTP header name for retry-after duration in seconds
    pub const RETRY_AFTER: &str = "Retry-After";
}

/// Create a `HeaderMap` with rate limit headers
#[must_use]
pub fn create_rate_limit_headers(result: &RateLimitResult) -> HeaderMap {
    let mut header_map = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(&result.limit.to_string()) {
        header_map.insert(headers::X_RATE_LIMIT_LIMIT, value);
    }

    if let Ok(value) = HeaderValue::from_str(&result.remaining.to_string()) {
        header_map.insert(headers::X_RATE_LIMIT_REMAINING, value);
    }

    if let Ok(value) = HeaderValue::from_str(&result.reset_epoch_seconds.to_string()) {
        header_map.insert(headers::X_RATE_LIMIT_RESET, value);
    }

    // Seconds until reset, floored at 0 (bypass results report reset 0)
    let retry_after = (result.reset_epoch_seconds - chrono::Utc::now().timestamp()).max(0);
    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
        header_map.insert(headers::RETRY_AFTER, value);
    }

    header_map
}

/// Create a rate limit exceeded error from a rejecting result
#[must_use]
pub fn create_rate_limit_error(result: &RateLimitResult) -> AppError {
    let message = result.error.clone().unwrap_or_else(|| {
        format!(
            "Rate limit exceeded. You have reached your limit of {} requests",
            result.limit
        )
    });
    AppError::new(ErrorCode::RateLimitExceeded, message)
}

/// Axum middleware enforcing the rate limit on every request it wraps
///
/// Over-quota callers receive a 429 with a JSON error body and the standard
/// headers; allowed requests proceed and get the same headers attached to
/// the response. Failure to persist a freshly issued guest cookie is
/// swallowed; the request was already counted under the fresh id.
pub async fn rate_limit_middleware(
    State(engine): State<Arc<RateLimitEngine>>,
    request: Request,
    next: Next,
) -> Response {
    let outcome = match engine.check_rate_limit(request.headers()).await {
        Ok(outcome) => outcome,
        // Only unregistered roles land here; dependency outages fail open
        // inside the engine.
        Err(e) => return e.into_response(),
    };

    let quota_headers = create_rate_limit_headers(&outcome.result);
    let guest_cookie = outcome
        .pending_guest_cookie
        .as_deref()
        .map(|id| crate::security::cookies::build_guest_cookie(id, engine.secure_cookies()));

    let mut response = if outcome.result.success {
        next.run(request).await
    } else {
        let error = create_rate_limit_error(&outcome.result);
        (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(ErrorResponse::from(error)),
        )
            .into_response()
    };

    response.headers_mut().extend(quota_headers);
    if let Some(cookie) = guest_cookie {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(http::header::SET_COOKIE, value);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn rejected_result() -> RateLimitResult {
        RateLimitResult {
            success: false,
            limit: 9_000,
            remaining: 0,
            reset_epoch_seconds: chrono::Utc::now().timestamp() + 3_600,
            role: Role::Registered,
            identifier: "user-1".into(),
            error: Some(
                "Rate limit exceeded. Registered users are limited to 9000 requests per day."
                    .into(),
            ),
        }
    }

    #[test]
    fn test_rate_limit_error_creation() {
        let error = create_rate_limit_error(&rejected_result());
        assert_eq!(error.code, ErrorCode::RateLimitExceeded);
        assert_eq!(error.http_status(), 429);
        assert!(error.message.contains("9000"));
        assert!(error.message.contains("Registered"));
    }

    #[test]
    fn test_headers_present_and_consistent() {
        let result = rejected_result();
        let header_map = create_rate_limit_headers(&result);

        assert_eq!(header_map.get(headers::X_RATE_LIMIT_LIMIT).unwrap(), "9000");
        assert_eq!(header_map.get(headers::X_RATE_LIMIT_REMAINING).unwrap(), "0");
        assert_eq!(
            header_map.get(headers::X_RATE_LIMIT_RESET).unwrap(),
            &result.reset_epoch_seconds.to_string()
        );

        let retry_after: i64 = header_map
            .get(headers::RETRY_AFTER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry_after > 0 && retry_after <= 3_600);
    }

    #[test]
    fn test_retry_after_floored_at_zero() {
        let result = RateLimitResult {
            reset_epoch_seconds: 0,
            ..rejected_result()
        };
        let header_map = create_rate_limit_headers(&result);
        assert_eq!(header_map.get(headers::RETRY_AFTER).unwrap(), "0");
    }
}
