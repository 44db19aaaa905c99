// ABOUTME: Rate limit decision engine with role-aware quota enforcement
// ABOUTME: Role config registry, quota checks against the counting backend, and fail-open degradation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

//! # Rate Limit Decision Engine
//!
//! The engine answers one question per request: is this caller within their
//! quota? It resolves the caller's role from the session and subscription
//! state, derives a stable identifier, and performs a single atomic
//! increment-and-check against the counting backend.
//!
//! Dependency failures never surface to the caller as hard errors: session
//! lookups degrade to anonymous, subscription lookups degrade to
//! unentitled, and counting-backend outages degrade to allowing the request.
//! The worst outcome of an outage is that rate limiting silently stops
//! enforcing, not a 500.

use crate::auth::{SessionProvider, SubscriptionProvider};
use crate::constants::{cookies::GUEST_COOKIE_NAME, keys, limits};
use crate::counter::{CounterDecision, CounterProvider};
use crate::errors::{AppError, AppResult};
use crate::identity::{derive_identifier, DerivedIdentity};
use crate::models::{Role, Session};
use dashmap::DashMap;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Immutable per-role quota configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub limit: u32,
    /// Window length in seconds
    pub window_seconds: u64,
    /// Human-readable role name used in rejection messages
    pub display_name: String,
    /// Include the weak browser fingerprint in anonymous identifiers
    pub use_browser_fingerprint: bool,
    /// Collapse RFC1918 client IPs to their /16 prefix and lead with the
    /// fingerprint
    pub handle_shared_networks: bool,
    /// Scope anonymous identifiers by a persistent guest cookie
    pub use_guest_cookie: bool,
}

impl RateLimitConfig {
    /// Built-in configuration for the `anonymous` role
    #[must_use]
    pub fn anonymous_default() -> Self {
        Self {
            limit: limits::ANONYMOUS_REQUESTS_PER_WINDOW,
            window_seconds: limits::DEFAULT_WINDOW_SECONDS,
            display_name: "Anonymous".into(),
            use_browser_fingerprint: true,
            handle_shared_networks: true,
            use_guest_cookie: true,
        }
    }

    /// Built-in configuration for the `registered` role
    #[must_use]
    pub fn registered_default() -> Self {
        Self {
            limit: limits::REGISTERED_REQUESTS_PER_WINDOW,
            window_seconds: limits::DEFAULT_WINDOW_SECONDS,
            display_name: "Registered".into(),
            use_browser_fingerprint: false,
            handle_shared_networks: false,
            use_guest_cookie: false,
        }
    }

    /// Built-in configuration for the `paid` role
    ///
    /// The limit is numerically lower than the registered limit; this matches
    /// the reference configuration and is preserved pending product
    /// clarification.
    #[must_use]
    pub fn paid_default() -> Self {
        Self {
            limit: limits::PAID_REQUESTS_PER_WINDOW,
            window_seconds: limits::DEFAULT_WINDOW_SECONDS,
            display_name: "Paid".into(),
            use_browser_fingerprint: false,
            handle_shared_networks: false,
            use_guest_cookie: false,
        }
    }

    /// Window as a `Duration`
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    fn validate(&self) -> AppResult<()> {
        if self.limit == 0 {
            return Err(AppError::config_invalid("rate limit must be positive"));
        }
        if self.window_seconds == 0 {
            return Err(AppError::config_invalid("rate limit window must be positive"));
        }
        Ok(())
    }

    /// Phrase describing the window in rejection messages
    fn window_phrase(&self) -> String {
        match self.window_seconds {
            86_400 => "day".to_owned(),
            3_600 => "hour".to_owned(),
            60 => "minute".to_owned(),
            secs => format!("{secs} seconds"),
        }
    }

    fn exceeded_message(&self) -> String {
        format!(
            "Rate limit exceeded. {} users are limited to {} requests per {}.",
            self.display_name,
            self.limit,
            self.window_phrase()
        )
    }
}

/// Role configuration registry
///
/// Read-mostly map from role to quota config. The three built-in roles are
/// always present; additional roles can be registered at runtime (additive
/// only, last write wins on duplicates).
pub struct RoleRegistry {
    configs: DashMap<Role, RateLimitConfig>,
}

impl RoleRegistry {
    /// Create a registry seeded with the built-in role configurations
    #[must_use]
    pub fn with_defaults() -> Self {
        let configs = DashMap::new();
        configs.insert(Role::Anonymous, RateLimitConfig::anonymous_default());
        configs.insert(Role::Registered, RateLimitConfig::registered_default());
        configs.insert(Role::Paid, RateLimitConfig::paid_default());
        Self { configs }
    }

    /// Look up the configuration for a role
    ///
    /// # Errors
    ///
    /// Returns an error for roles that were never registered. Built-in roles
    /// always resolve; hitting this for a custom role is a programmer error
    /// at the call site.
    pub fn get(&self, role: &Role) -> AppResult<RateLimitConfig> {
        self.configs.get(role).map(|entry| entry.value().clone()).ok_or_else(|| {
            AppError::config_missing(format!("no rate limit config for role '{role}'"))
        })
    }

    /// Register or replace the configuration for a role
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn register(&self, role: Role, config: RateLimitConfig) -> AppResult<()> {
        config.validate()?;
        self.configs.insert(role, config);
        Ok(())
    }
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Outcome of one quota check
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitResult {
    /// Whether the request is within budget
    pub success: bool,
    /// Maximum requests allowed in the window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// Unix timestamp (seconds) at which the window frees a slot; 0 in
    /// bypass mode
    pub reset_epoch_seconds: i64,
    /// Role the caller resolved to
    pub role: Role,
    /// Identifier the quota was scoped by
    pub identifier: String,
    /// Human-readable rejection message, present only when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RateLimitResult {
    fn from_decision(
        role: Role,
        identifier: String,
        config: &RateLimitConfig,
        decision: &CounterDecision,
    ) -> Self {
        let error = (!decision.allowed).then(|| config.exceeded_message());
        Self {
            success: decision.allowed,
            limit: config.limit,
            remaining: decision.remaining,
            reset_epoch_seconds: decision.reset_epoch_seconds,
            role,
            identifier,
            error,
        }
    }

    fn bypass(role: Role, identifier: String, limit: u32, remaining: u32) -> Self {
        Self {
            success: true,
            limit,
            remaining,
            reset_epoch_seconds: 0,
            role,
            identifier,
            error: None,
        }
    }
}

/// Result of the full per-request pipeline, plus the guest id the HTTP
/// boundary must persist when one was freshly issued
#[derive(Debug, Clone)]
pub struct RateLimitOutcome {
    /// The quota decision
    pub result: RateLimitResult,
    /// Guest id to set as a cookie on the response, if newly issued
    pub pending_guest_cookie: Option<String>,
}

/// Per-role binding of quota parameters to the counting backend
///
/// Constructed once per role and cached, since it fixes the (limit, window,
/// namespace) triple every consume call for that role uses.
struct RoleBinding {
    config: RateLimitConfig,
    key_prefix: String,
}

impl RoleBinding {
    fn new(role: &Role, config: RateLimitConfig) -> Self {
        // Per-role namespace first, then the anon/user segment, so every
        // role counts in its own keyspace.
        let key_prefix = format!(
            "{}:{}:{}",
            keys::COUNTER_KEY_PREFIX,
            role.as_str(),
            role.counter_prefix()
        );
        Self { config, key_prefix }
    }

    fn counter_key(&self, identifier: &str) -> String {
        format!("{}:{}", self.key_prefix, identifier)
    }
}

/// Rate limit decision engine
///
/// Explicitly constructed and passed around (no process-wide singleton) so
/// tests can substitute fake providers per instance.
pub struct RateLimitEngine {
    registry: RoleRegistry,
    sessions: Arc<dyn SessionProvider>,
    subscriptions: Arc<dyn SubscriptionProvider>,
    counter: Option<Arc<dyn CounterProvider>>,
    bindings: DashMap<Role, Arc<RoleBinding>>,
    bypass_warned: AtomicBool,
    secure_cookies: bool,
}

impl RateLimitEngine {
    /// Create an engine with the built-in role configurations
    ///
    /// `counter` is `None` when no counting backend is configured; the engine
    /// then allows every request and warns once.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        subscriptions: Arc<dyn SubscriptionProvider>,
        counter: Option<Arc<dyn CounterProvider>>,
    ) -> Self {
        Self {
            registry: RoleRegistry::with_defaults(),
            sessions,
            subscriptions,
            counter,
            bindings: DashMap::new(),
            bypass_warned: AtomicBool::new(false),
            secure_cookies: false,
        }
    }

    /// Mark issued guest cookies `Secure` (production deployments)
    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Whether issued guest cookies carry the `Secure` attribute
    #[must_use]
    pub const fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    /// Look up the configuration for a role
    ///
    /// # Errors
    ///
    /// Returns an error for roles that were never registered
    pub fn config_for(&self, role: &Role) -> AppResult<RateLimitConfig> {
        self.registry.get(role)
    }

    /// Register or replace a role configuration at runtime
    ///
    /// Takes effect for subsequent requests; the cached per-role binding is
    /// dropped so the next check picks up the new parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn register_role(&self, role: Role, config: RateLimitConfig) -> AppResult<()> {
        self.registry.register(role.clone(), config)?;
        self.bindings.remove(&role);
        Ok(())
    }

    /// Resolve the caller's role from their session
    ///
    /// Never errors: the subscription lookup failing degrades to
    /// `registered`, and a missing or anonymous session is `anonymous`.
    /// Precedence is `paid > registered > anonymous`.
    pub async fn determine_role(&self, session: Option<&Session>) -> Role {
        let Some(user) = session.and_then(|s| s.user.as_ref()) else {
            return Role::Anonymous;
        };

        if user.is_anonymous {
            return Role::Anonymous;
        }

        match self.subscriptions.list_subscriptions(&user.id).await {
            Ok(subscriptions) => {
                if subscriptions.iter().any(|sub| sub.status.is_entitled()) {
                    Role::Paid
                } else {
                    Role::Registered
                }
            }
            Err(e) => {
                // Fail toward the less-privileged role, never toward paid.
                warn!("subscription lookup failed, treating user as unentitled: {e}");
                Role::Registered
            }
        }
    }

    /// Check the quota for an already-derived `(role, identifier)` pair
    ///
    /// Degraded modes are part of the contract: an unconfigured backend
    /// bypasses with a sentinel remaining count, and a failing backend
    /// bypasses with zero remaining. Both log.
    ///
    /// # Errors
    ///
    /// Returns an error only for roles with no registered configuration,
    /// which is a programmer error at the call site. Counting-backend
    /// failures never propagate.
    pub async fn check_quota(&self, role: &Role, identifier: &str) -> AppResult<RateLimitResult> {
        let binding = self.binding_for(role)?;

        let Some(counter) = self.counter.as_ref() else {
            if !self.bypass_warned.swap(true, Ordering::Relaxed) {
                warn!("no counting backend configured; rate limiting is bypassed");
            }
            return Ok(RateLimitResult::bypass(
                role.clone(),
                identifier.to_owned(),
                binding.config.limit,
                limits::BYPASS_REMAINING_SENTINEL,
            ));
        };

        let key = binding.counter_key(identifier);
        match counter
            .consume(&key, binding.config.limit, binding.config.window())
            .await
        {
            Ok(decision) => Ok(RateLimitResult::from_decision(
                role.clone(),
                identifier.to_owned(),
                &binding.config,
                &decision,
            )),
            Err(e) => {
                // Availability over strict enforcement: a counting outage
                // must not reject traffic.
                warn!("counting backend error, failing open: {e}");
                Ok(RateLimitResult::bypass(
                    role.clone(),
                    identifier.to_owned(),
                    binding.config.limit,
                    0,
                ))
            }
        }
    }

    /// Run the full pipeline for one request: session → role → identifier →
    /// quota
    ///
    /// # Errors
    ///
    /// Returns an error only for unregistered roles; every external
    /// dependency failure degrades to a safe default instead.
    pub async fn check_rate_limit(&self, headers: &HeaderMap) -> AppResult<RateLimitOutcome> {
        let session = match self.sessions.session(headers).await {
            Ok(session) => session,
            Err(e) => {
                warn!("session lookup failed, treating request as anonymous: {e}");
                None
            }
        };

        let role = self.determine_role(session.as_ref()).await;
        let config = self.config_for(&role)?;

        let guest_id = crate::security::cookies::get_cookie_value(headers, GUEST_COOKIE_NAME);
        let DerivedIdentity {
            identifier,
            issued_guest_id,
        } = derive_identifier(&role, session.as_ref(), headers, &config, guest_id.as_deref());

        let result = self.check_quota(&role, &identifier).await?;

        Ok(RateLimitOutcome {
            result,
            pending_guest_cookie: issued_guest_id,
        })
    }

    /// Verify the counting backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if a backend is configured and unreachable
    pub async fn counter_health(&self) -> AppResult<()> {
        match self.counter.as_ref() {
            Some(counter) => counter.health_check().await,
            None => Ok(()),
        }
    }

    fn binding_for(&self, role: &Role) -> AppResult<Arc<RoleBinding>> {
        if let Some(binding) = self.bindings.get(role) {
            return Ok(Arc::clone(binding.value()));
        }

        let config = self.registry.get(role)?;
        let binding = Arc::new(RoleBinding::new(role, config));
        // Two racing constructions are equivalent; last insert wins.
        self.bindings.insert(role.clone(), Arc::clone(&binding));
        Ok(binding)
    }
}
