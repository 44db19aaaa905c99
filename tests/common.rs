// ABOUTME: Shared test utilities and stub providers for integration tests
// ABOUTME: Provides fake session/subscription/counter collaborators and engine builders
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

//! Shared test utilities for `quotagate`
//!
//! Stub implementations of every external collaborator so integration tests
//! can drive the engine without an auth provider, billing service, or Redis.

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue};
use quotagate::auth::{SessionProvider, SubscriptionProvider};
use quotagate::counter::memory::InMemoryCounter;
use quotagate::counter::{CounterDecision, CounterProvider};
use quotagate::errors::{AppError, AppResult};
use quotagate::models::{Session, SessionUser, Subscription, SubscriptionStatus};
use quotagate::rate_limiting::RateLimitEngine;
use std::sync::{Arc, Once};
use std::time::Duration;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Session provider returning a fixed session
pub struct StaticSessionProvider(pub Option<Session>);

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn session(&self, _headers: &HeaderMap) -> AppResult<Option<Session>> {
        Ok(self.0.clone())
    }
}

/// Session provider simulating an auth backend outage
pub struct FailingSessionProvider;

#[async_trait]
impl SessionProvider for FailingSessionProvider {
    async fn session(&self, _headers: &HeaderMap) -> AppResult<Option<Session>> {
        Err(AppError::external("auth backend offline"))
    }
}

/// Subscription provider returning a fixed subscription list
pub struct StaticSubscriptionProvider(pub Vec<Subscription>);

#[async_trait]
impl SubscriptionProvider for StaticSubscriptionProvider {
    async fn list_subscriptions(&self, _user_id: &str) -> AppResult<Vec<Subscription>> {
        Ok(self.0.clone())
    }
}

/// Subscription provider simulating a billing service outage
pub struct FailingSubscriptionProvider;

#[async_trait]
impl SubscriptionProvider for FailingSubscriptionProvider {
    async fn list_subscriptions(&self, _user_id: &str) -> AppResult<Vec<Subscription>> {
        Err(AppError::external("billing service offline"))
    }
}

/// Counter backend that always errors
pub struct FailingCounter;

#[async_trait]
impl CounterProvider for FailingCounter {
    async fn consume(
        &self,
        _key: &str,
        _limit: u32,
        _window: Duration,
    ) -> AppResult<CounterDecision> {
        Err(AppError::external("counter backend offline"))
    }

    async fn health_check(&self) -> AppResult<()> {
        Err(AppError::external("counter backend offline"))
    }
}

/// Session for a registered (non-anonymous) user
pub fn registered_session(user_id: &str) -> Session {
    Session {
        user: Some(SessionUser {
            id: user_id.to_owned(),
            is_anonymous: false,
        }),
    }
}

/// Session for an anonymous/guest auth record
pub fn guest_auth_session(user_id: &str) -> Session {
    Session {
        user: Some(SessionUser {
            id: user_id.to_owned(),
            is_anonymous: true,
        }),
    }
}

/// A subscription with the given status
pub fn subscription(status: SubscriptionStatus) -> Subscription {
    Subscription { status }
}

/// Engine with stubbed providers and an in-memory counter
pub fn engine(
    session: Option<Session>,
    subscriptions: Vec<Subscription>,
) -> RateLimitEngine {
    init_test_logging();
    RateLimitEngine::new(
        Arc::new(StaticSessionProvider(session)),
        Arc::new(StaticSubscriptionProvider(subscriptions)),
        Some(Arc::new(InMemoryCounter::new(1024))),
    )
}

/// Request headers for an anonymous caller at a fixed IP and user agent
pub fn anonymous_headers(ip: &str, user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", HeaderValue::from_str(ip).unwrap());
    headers.insert("user-agent", HeaderValue::from_str(user_agent).unwrap());
    headers
}

/// Attach a guest cookie to existing headers
pub fn with_guest_cookie(mut headers: HeaderMap, guest_id: &str) -> HeaderMap {
    headers.insert(
        http::header::COOKIE,
        HeaderValue::from_str(&format!("guest_id={guest_id}")).unwrap(),
    );
    headers
}
