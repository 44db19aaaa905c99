// ABOUTME: Main library entry point for the Quotagate rate limit decision engine
// ABOUTME: Resolves caller roles, derives quota identities, and enforces sliding-window limits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

#![deny(unsafe_code)]

//! # Quotagate
//!
//! A role-aware rate limit decision engine. Given an inbound request's headers
//! and an (optional) authenticated session, Quotagate determines which role the
//! caller belongs to, derives a stable identifier for quota scoping, and asks a
//! shared sliding-window counting backend whether the request is within budget.
//!
//! ## Features
//!
//! - **Role resolution**: `anonymous` / `registered` / `paid` with precedence
//!   `paid > registered > anonymous`, plus runtime-registered custom roles
//! - **Anonymous identity**: client IP, weak browser fingerprint, and a
//!   persistent guest cookie, with shared-network (NAT) masking
//! - **Pluggable counting backends**: Redis sliding-window log for
//!   multi-instance deployments, in-memory backend for development and tests
//! - **Fail-open by design**: dependency outages degrade to allowing requests,
//!   never to 500s
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use quotagate::auth::{NoSessionProvider, NoSubscriptionProvider};
//! use quotagate::counter::memory::InMemoryCounter;
//! use quotagate::errors::AppResult;
//! use quotagate::rate_limiting::RateLimitEngine;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let engine = RateLimitEngine::new(
//!         Arc::new(NoSessionProvider),
//!         Arc::new(NoSubscriptionProvider),
//!         Some(Arc::new(InMemoryCounter::with_default_capacity())),
//!     );
//!
//!     let headers = http::HeaderMap::new();
//!     let outcome = engine.check_rate_limit(&headers).await?;
//!     println!("allowed: {}", outcome.result.success);
//!
//!     Ok(())
//! }
//! ```

/// External session and subscription provider contracts
pub mod auth;

/// Configuration management for deployment-specific settings
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Sliding-window counting backends (Redis, in-memory)
pub mod counter;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Caller identity derivation for quota scoping
pub mod identity;

/// Logging configuration and structured logging setup
pub mod logging;

/// HTTP middleware for rate limit enforcement and response headers
pub mod middleware;

/// Common data structures: roles, sessions, subscriptions
pub mod models;

/// Rate limit decision engine, role registry, and quota checks
pub mod rate_limiting;

/// Cookie handling utilities
pub mod security;
