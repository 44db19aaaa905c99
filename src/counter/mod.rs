// ABOUTME: Sliding-window counting backend abstraction for quota enforcement
// ABOUTME: Pluggable backend support (in-memory, Redis) behind one atomic consume operation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

/// Counter factory for environment-based backend selection
pub mod factory;
/// In-memory sliding-window counter
pub mod memory;
/// Redis-backed sliding-window counter
pub mod redis;

use crate::config::environment::RedisConnectionConfig;
use crate::errors::AppResult;
use std::time::Duration;

/// Outcome of one atomic consume operation
#[derive(Debug, Clone, Copy)]
pub struct CounterDecision {
    /// Whether this attempt was within budget
    pub allowed: bool,
    /// Requests left in the current window after this attempt
    pub remaining: u32,
    /// Unix timestamp (seconds) at which the window frees a slot
    pub reset_epoch_seconds: i64,
}

/// Counting backend contract
///
/// Implementations maintain a sliding-window count per key: bursts aligned to
/// window boundaries must not double the effective rate. `consume` is the
/// single atomic operation: it both records the attempt and reports whether
/// it was within budget in one round trip, so concurrent requests for the
/// same key cannot race between check and increment.
#[async_trait::async_trait]
pub trait CounterProvider: Send + Sync {
    /// Record an attempt against `key` and report whether it fit within
    /// `limit` requests per `window`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or the operation fails.
    /// Callers are expected to fail open on error.
    async fn consume(&self, key: &str, limit: u32, window: Duration) -> AppResult<CounterDecision>;

    /// Verify the backend is reachable and healthy
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn health_check(&self) -> AppResult<()>;
}

/// Counting backend configuration
#[derive(Debug, Clone)]
pub struct CounterConfig {
    /// Redis connection URL; `None` selects bypass mode
    pub redis_url: Option<String>,
    /// Redis connection tuning
    pub redis_connection: RedisConnectionConfig,
    /// Maximum keys tracked by the in-memory backend before LRU eviction
    pub max_tracked_keys: usize,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            redis_connection: RedisConnectionConfig::default(),
            max_tracked_keys: 100_000,
        }
    }
}
