// ABOUTME: HTTP middleware for rate limit enforcement and response headers
// ABOUTME: Wires the decision engine into the axum request path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

pub mod rate_limiting;

// Rate limiting middleware and utilities
pub use rate_limiting::{
    create_rate_limit_error, create_rate_limit_headers, headers, rate_limit_middleware,
};
