// ABOUTME: System-wide constants and configuration values for the rate limit engine
// ABOUTME: Contains role quota literals, cookie attributes, key prefixes, and env accessors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

//! # Constants Module
//!
//! Application constants and environment-based configuration values.
//! This module provides both hardcoded constants and environment variable configuration.

use std::env;

/// Built-in role quota literals
///
/// These values are load-bearing for behavioral compatibility: the paid limit
/// is numerically lower than the registered limit in the reference
/// configuration and is preserved as-is pending product clarification.
pub mod limits {
    /// Requests per window for anonymous callers
    pub const ANONYMOUS_REQUESTS_PER_WINDOW: u32 = 5;

    /// Requests per window for registered callers
    pub const REGISTERED_REQUESTS_PER_WINDOW: u32 = 9_000;

    /// Requests per window for paid callers
    pub const PAID_REQUESTS_PER_WINDOW: u32 = 100;

    /// Default quota window (24 hours)
    pub const DEFAULT_WINDOW_SECONDS: u64 = 86_400;

    /// Remaining-count sentinel reported when the counter backend is unconfigured
    pub const BYPASS_REMAINING_SENTINEL: u32 = 999;
}

/// Guest cookie contract
pub mod cookies {
    /// Name of the persistent anonymous-identity cookie
    pub const GUEST_COOKIE_NAME: &str = "guest_id";

    /// Guest cookie lifetime (30 days)
    pub const GUEST_COOKIE_MAX_AGE_SECS: u64 = 2_592_000;
}

/// Counting-store key namespaces
pub mod keys {
    /// Prefix for every counter key written by this engine
    pub const COUNTER_KEY_PREFIX: &str = "ratelimit";

    /// Key segment for anonymous identities
    pub const ANONYMOUS_KEY_PREFIX: &str = "anon";

    /// Key segment for authenticated identities (registered and paid)
    pub const USER_KEY_PREFIX: &str = "user";
}

/// Browser fingerprint recipe
///
/// The fingerprint is a weak, deterministic grouping signal, not a security
/// boundary. The header list and output length are observable behavior and
/// must not change silently.
pub mod fingerprint {
    /// Headers digested into the fingerprint, in order; missing headers are
    /// treated as empty strings
    pub const FINGERPRINT_HEADERS: [&str; 5] = [
        "user-agent",
        "accept-language",
        "accept-encoding",
        "connection",
        "dnt",
    ];

    /// Length the base64-encoded digest is truncated to
    pub const FINGERPRINT_LENGTH: usize = 16;
}

/// Service name constants
pub mod service_names {
    /// Canonical server binary/service name
    pub const QUOTAGATE_SERVER: &str = "quotagate-server";
}

/// Default network ports
pub mod ports {
    /// Default HTTP server port
    pub const DEFAULT_HTTP_PORT: u16 = 8080;
}

/// Environment-based configuration
pub mod env_config {
    use super::env;

    /// Get `HTTP` server port from environment or default
    #[must_use]
    pub fn http_port() -> u16 {
        env::var("HTTP_PORT")
            .unwrap_or_else(|_| crate::constants::ports::DEFAULT_HTTP_PORT.to_string())
            .parse()
            .unwrap_or(crate::constants::ports::DEFAULT_HTTP_PORT)
    }

    /// Get the Redis `URL` for the counting backend, if configured
    #[must_use]
    pub fn redis_url() -> Option<String> {
        env::var("REDIS_URL").ok().filter(|url| !url.is_empty())
    }

    /// Get deployment environment name from environment or default
    #[must_use]
    pub fn environment() -> String {
        env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_limit_literals() {
        assert_eq!(limits::ANONYMOUS_REQUESTS_PER_WINDOW, 5);
        assert_eq!(limits::REGISTERED_REQUESTS_PER_WINDOW, 9_000);
        assert_eq!(limits::PAID_REQUESTS_PER_WINDOW, 100);
        assert_eq!(limits::DEFAULT_WINDOW_SECONDS, 86_400);
    }

    #[test]
    fn test_guest_cookie_lifetime_is_thirty_days() {
        assert_eq!(cookies::GUEST_COOKIE_MAX_AGE_SECS, 30 * 24 * 60 * 60);
    }
}
