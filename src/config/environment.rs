// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

//! Environment-based configuration management for production deployment

use crate::constants::env_config;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Environment type for cookie security and other configurations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated test runs
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" => Self::Production,
            "testing" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Whether this deployment serves production traffic
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Redis connection tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConnectionConfig {
    /// Seconds to wait for the initial TCP connect
    pub connection_timeout_secs: u64,
    /// Seconds to wait for a command response
    pub response_timeout_secs: u64,
    /// Retries while establishing the first connection
    pub initial_connection_retries: u32,
    /// Retries performed by the connection manager on dropped connections
    pub reconnection_retries: u32,
    /// Delay before the first initial-connection retry
    pub initial_retry_delay_ms: u64,
    /// Upper bound for exponential backoff delays
    pub max_retry_delay_ms: u64,
}

impl Default for RedisConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 5,
            response_timeout_secs: 2,
            initial_connection_retries: 3,
            reconnection_retries: 6,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 2_000,
        }
    }
}

impl RedisConnectionConfig {
    /// Load connection tuning from environment variables, falling back to
    /// defaults for anything unset or unparseable
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connection_timeout_secs: parse_env("REDIS_CONNECTION_TIMEOUT_SECS")
                .unwrap_or(defaults.connection_timeout_secs),
            response_timeout_secs: parse_env("REDIS_RESPONSE_TIMEOUT_SECS")
                .unwrap_or(defaults.response_timeout_secs),
            initial_connection_retries: parse_env("REDIS_INITIAL_CONNECTION_RETRIES")
                .unwrap_or(defaults.initial_connection_retries),
            reconnection_retries: parse_env("REDIS_RECONNECTION_RETRIES")
                .unwrap_or(defaults.reconnection_retries),
            initial_retry_delay_ms: parse_env("REDIS_INITIAL_RETRY_DELAY_MS")
                .unwrap_or(defaults.initial_retry_delay_ms),
            max_retry_delay_ms: parse_env("REDIS_MAX_RETRY_DELAY_MS")
                .unwrap_or(defaults.max_retry_delay_ms),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}

/// Server configuration loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Redis URL for the counting backend; absent means bypass mode
    pub redis_url: Option<String>,
    /// Redis connection tuning
    pub redis_connection: RedisConnectionConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a present variable fails validation
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_str_or_default(&env_config::environment());

        let config = Self {
            http_port: env_config::http_port(),
            environment,
            redis_url: env_config::redis_url(),
            redis_connection: RedisConnectionConfig::from_env(),
        };

        config.validate().context("invalid server configuration")?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.http_port == 0 {
            anyhow::bail!("HTTP_PORT must be non-zero");
        }
        if let Some(url) = &self.redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                anyhow::bail!("REDIS_URL must start with redis:// or rediss://");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str_or_default("Production"),
            Environment::Production
        );
        assert_eq!(
            Environment::from_str_or_default("testing"),
            Environment::Testing
        );
        assert_eq!(
            Environment::from_str_or_default("anything-else"),
            Environment::Development
        );
        assert!(Environment::Production.is_production());
        assert!(!Environment::Development.is_production());
    }

    #[test]
    fn test_redis_url_validation() {
        let config = ServerConfig {
            http_port: 8080,
            environment: Environment::Testing,
            redis_url: Some("http://not-redis".into()),
            redis_connection: RedisConnectionConfig::default(),
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            redis_url: Some("redis://localhost:6379".into()),
            ..config
        };
        assert!(config.validate().is_ok());
    }
}
