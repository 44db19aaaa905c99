// ABOUTME: External collaborator contracts for session and subscription lookups
// ABOUTME: Provider traits the rate limit engine consumes; every failure maps to a safe default
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

//! # Auth Provider Contracts
//!
//! The engine treats authentication and billing as external collaborators
//! behind narrow async traits. Implementations call out to the managed auth
//! and subscription services; the engine maps every error branch to a
//! conservative default (anonymous role, no entitlement) and never lets a
//! provider failure surface to the caller as a hard error.

use crate::errors::AppResult;
use crate::models::{Session, Subscription};
use http::HeaderMap;

/// Session lookup against the external auth provider
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolve the session carried on the request headers, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the auth provider is unreachable or rejects the
    /// lookup. The engine treats any error as "no session".
    async fn session(&self, headers: &HeaderMap) -> AppResult<Option<Session>>;
}

/// Subscription lookup against the external billing service
#[async_trait::async_trait]
pub trait SubscriptionProvider: Send + Sync {
    /// List the subscriptions attached to a user
    ///
    /// # Errors
    ///
    /// Returns an error if the billing service is unreachable. The engine
    /// treats any error as "no active subscription", never as entitlement.
    async fn list_subscriptions(&self, user_id: &str) -> AppResult<Vec<Subscription>>;
}

/// Session provider for deployments without an auth backend
///
/// Every caller is anonymous. Useful for single-tenant installs and tests.
pub struct NoSessionProvider;

#[async_trait::async_trait]
impl SessionProvider for NoSessionProvider {
    async fn session(&self, _headers: &HeaderMap) -> AppResult<Option<Session>> {
        Ok(None)
    }
}

/// Subscription provider for deployments without a billing backend
pub struct NoSubscriptionProvider;

#[async_trait::async_trait]
impl SubscriptionProvider for NoSubscriptionProvider {
    async fn list_subscriptions(&self, _user_id: &str) -> AppResult<Vec<Subscription>> {
        Ok(Vec::new())
    }
}
