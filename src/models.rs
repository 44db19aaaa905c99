// ABOUTME: Common data structures for roles, sessions, and subscriptions
// ABOUTME: Defines the caller classification model used by the rate limit engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Caller classification driving which quota and identifier strategy apply
///
/// Precedence is `paid > registered > anonymous`: a caller satisfying multiple
/// conditions resolves to the highest applicable role. The three built-in
/// roles are compile-time variants; roles registered at runtime ride the
/// `Custom` variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// No authenticated user, or an anonymous/guest auth record
    Anonymous,
    /// Authenticated user without an active subscription
    Registered,
    /// Authenticated user with an `active` or `trialing` subscription
    Paid,
    /// Runtime-registered role with its own quota configuration
    Custom(String),
}

impl Role {
    /// Role name as used in serialized results and counter key namespaces
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Registered => "registered",
            Self::Paid => "paid",
            Self::Custom(name) => name,
        }
    }

    /// Counting-store key segment for this role
    ///
    /// Anonymous identities count under `anon`; every authenticated role
    /// shares the `user` segment and is isolated by its per-role namespace.
    #[must_use]
    pub fn counter_prefix(&self) -> &'static str {
        match self {
            Self::Anonymous => crate::constants::keys::ANONYMOUS_KEY_PREFIX,
            _ => crate::constants::keys::USER_KEY_PREFIX,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "anonymous" => Self::Anonymous,
            "registered" => Self::Registered,
            "paid" => Self::Paid,
            _ => Self::Custom(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Custom(name) => name,
            builtin => builtin.as_str().to_owned(),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Authenticated session as exposed by the external session provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// User attached to the session, if any
    pub user: Option<SessionUser>,
}

/// User record carried on a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    /// Stable user id issued by the auth provider
    pub id: String,
    /// Whether this is an anonymous/guest auth record
    #[serde(default)]
    pub is_anonymous: bool,
}

/// Subscription record as exposed by the external subscription service
///
/// Only `status` is inspected by the engine; other fields the billing
/// provider returns are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Billing status of the subscription
    pub status: SubscriptionStatus,
}

/// Billing status of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Subscription is paid up
    Active,
    /// Subscription is in a trial period
    Trialing,
    /// Subscription was canceled
    Canceled,
    /// Payment is overdue
    PastDue,
    /// Any status this engine does not recognize
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Whether this status entitles the caller to the `paid` role
    #[must_use]
    pub const fn is_entitled(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}
