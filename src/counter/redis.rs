// ABOUTME: Redis-backed sliding-window counter with connection pooling
// ABOUTME: Shares quota counts across instances via an atomic ZSET pipeline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

use super::{CounterConfig, CounterDecision, CounterProvider};
use crate::config::environment::RedisConnectionConfig;
use crate::errors::{AppError, AppResult};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::time::Duration;
use tracing::{error, info, warn};

/// Redis sliding-window counter
///
/// Uses Redis `ConnectionManager` for automatic reconnection and connection
/// pooling. Each key holds a sorted set of attempt timestamps; one atomic
/// `MULTI` pipeline trims expired attempts, records the new one, and reads
/// the resulting count, so concurrent consumers of the same key cannot race
/// between check and increment.
#[derive(Clone)]
pub struct RedisCounter {
    manager: ConnectionManager,
}

impl RedisCounter {
    /// Extra TTL beyond the window so idle keys expire shortly after they
    /// stop mattering
    const TTL_SLACK_SECS: u64 = 60;

    /// Create a new Redis counter
    ///
    /// # Errors
    ///
    /// Returns an error if no URL is configured or the connection fails after
    /// all retries
    pub async fn new(config: &CounterConfig) -> AppResult<Self> {
        let redis_url = config
            .redis_url
            .as_ref()
            .ok_or_else(|| AppError::config("Redis URL is required for the Redis counter"))?;

        let conn_config = &config.redis_connection;

        info!(
            "Connecting to Redis at {} (timeout={}s, retries={})",
            redis_url, conn_config.connection_timeout_secs, conn_config.initial_connection_retries
        );

        let client = redis::Client::open(redis_url.as_str())
            .map_err(|e| AppError::internal(format!("Failed to create Redis client: {e}")))?;

        let manager = Self::connect_with_retry(&client, conn_config).await?;

        info!("Successfully connected to Redis");

        Ok(Self { manager })
    }

    /// Connect to Redis with exponential backoff retry on failure
    async fn connect_with_retry(
        client: &redis::Client,
        conn_config: &RedisConnectionConfig,
    ) -> AppResult<ConnectionManager> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(conn_config.connection_timeout_secs))
            .set_response_timeout(Duration::from_secs(conn_config.response_timeout_secs))
            .set_number_of_retries(conn_config.reconnection_retries as usize)
            .set_max_delay(conn_config.max_retry_delay_ms);

        let max_retries = conn_config.initial_connection_retries;
        let mut delay_ms = conn_config.initial_retry_delay_ms;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await {
                Ok(manager) => {
                    if attempt > 0 {
                        info!("Redis connection established after {} retries", attempt);
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < max_retries {
                        warn!(
                            "Redis connection attempt {}/{} failed, retrying in {}ms",
                            attempt + 1,
                            max_retries + 1,
                            delay_ms
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(conn_config.max_retry_delay_ms);
                    }
                }
            }
        }

        Err(AppError::internal(format!(
            "Failed to connect to Redis after {} retries: {}",
            max_retries + 1,
            last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
        )))
    }
}

#[async_trait::async_trait]
impl CounterProvider for RedisCounter {
    async fn consume(&self, key: &str, limit: u32, window: Duration) -> AppResult<CounterDecision> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now_ms - window_ms;
        // Member values carry a UUID so concurrent attempts in the same
        // millisecond stay distinct set members.
        let member = format!("{now_ms}-{}", uuid::Uuid::new_v4());
        let ttl_secs = i64::try_from(window.as_secs() + Self::TTL_SLACK_SECS).unwrap_or(i64::MAX);

        let mut conn = self.manager.clone();

        let (count, oldest): (u32, Vec<(String, i64)>) = redis::pipe()
            .atomic()
            .zrembyscore(key, 0, cutoff)
            .ignore()
            .zadd(key, member, now_ms)
            .ignore()
            .zcard(key)
            .zrange_withscores(key, 0, 0)
            .expire(key, ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis counter pipeline failed: {}", e);
                AppError::external(format!("Counter error: {e}"))
            })?;

        let oldest_ms = oldest.first().map_or(now_ms, |(_, score)| *score);

        Ok(CounterDecision {
            allowed: count <= limit,
            remaining: limit.saturating_sub(count),
            reset_epoch_seconds: (oldest_ms + window_ms) / 1000,
        })
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.manager.clone();

        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis PING failed: {}", e);
                AppError::external(format!("Counter error: {e}"))
            })?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::external(format!(
                "Counter error: unexpected PING response '{response}'"
            )))
        }
    }
}
