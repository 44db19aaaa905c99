// ABOUTME: Counter factory for environment-based backend selection
// ABOUTME: Picks Redis when configured, otherwise signals bypass mode to the engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

use super::memory::InMemoryCounter;
use super::redis::RedisCounter;
use super::{CounterConfig, CounterDecision, CounterProvider};
use crate::config::environment::ServerConfig;
use crate::errors::AppResult;
use std::time::Duration;

/// Unified counting backend
#[derive(Clone)]
pub enum Counter {
    /// Shared Redis backend for multi-instance deployments
    Redis(RedisCounter),
    /// Single-process in-memory backend for development and tests
    Memory(InMemoryCounter),
}

impl Counter {
    /// Create the counting backend selected by configuration
    ///
    /// Returns `Ok(None)` when no backend is configured; the engine then runs
    /// in bypass mode (fail open) and warns once.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured backend fails to initialize
    pub async fn from_config(config: &CounterConfig) -> AppResult<Option<Self>> {
        if config.redis_url.is_some() {
            let counter = RedisCounter::new(config).await?;
            return Ok(Some(Self::Redis(counter)));
        }

        Ok(None)
    }

    /// Create the counting backend for a server configuration
    ///
    /// The server's Redis settings select the Redis backend;
    /// `COUNTER_BACKEND=memory` forces the single-process in-memory backend
    /// regardless (development convenience).
    ///
    /// # Errors
    ///
    /// Returns an error if a configured backend fails to initialize
    pub async fn from_server_config(server: &ServerConfig) -> AppResult<Option<Self>> {
        if std::env::var("COUNTER_BACKEND").as_deref() == Ok("memory") {
            tracing::info!("Using in-memory counter backend (COUNTER_BACKEND=memory)");
            return Ok(Some(Self::Memory(InMemoryCounter::with_default_capacity())));
        }

        let config = CounterConfig {
            redis_url: server.redis_url.clone(),
            redis_connection: server.redis_connection.clone(),
            ..CounterConfig::default()
        };
        Self::from_config(&config).await
    }
}

#[async_trait::async_trait]
impl CounterProvider for Counter {
    async fn consume(&self, key: &str, limit: u32, window: Duration) -> AppResult<CounterDecision> {
        match self {
            Self::Redis(counter) => counter.consume(key, limit, window).await,
            Self::Memory(counter) => counter.consume(key, limit, window).await,
        }
    }

    async fn health_check(&self) -> AppResult<()> {
        match self {
            Self::Redis(counter) => counter.health_check().await,
            Self::Memory(counter) => counter.health_check().await,
        }
    }
}
