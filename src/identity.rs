// ABOUTME: Caller identity derivation for quota scoping
// ABOUTME: Extracts client IPs, computes weak browser fingerprints, and composes quota identifiers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

//! # Identity Derivation
//!
//! Authenticated callers are identified by their user id. Anonymous callers
//! are identified by a composition of up to three signals: the client IP
//! (from proxy headers), a weak browser fingerprint, and a persistent guest
//! cookie. Callers behind shared networks (RFC1918 ranges) are distinguished
//! primarily by fingerprint, with the IP collapsed to its /16 prefix.
//!
//! Derivation is deterministic: unchanged request metadata yields the exact
//! same identifier on every call. The only side effect is issuing a fresh
//! guest id when none is presented; persistence of that id is the HTTP
//! boundary's job, and the derived identifier uses the fresh value either way.

use crate::constants::fingerprint::{FINGERPRINT_HEADERS, FINGERPRINT_LENGTH};
use crate::models::{Role, Session};
use crate::rate_limiting::RateLimitConfig;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::HeaderMap;
use sha2::{Digest, Sha256};
use std::net::Ipv4Addr;

/// Identifier derived for one request, plus the guest id to persist if one
/// was freshly issued
#[derive(Debug, Clone)]
pub struct DerivedIdentity {
    /// Quota-scoping key for this caller within their role
    pub identifier: String,
    /// Freshly generated guest id the HTTP boundary should set as a cookie
    pub issued_guest_id: Option<String>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Extract the client IP from proxy headers
///
/// Priority order: first `X-Forwarded-For` entry, then `X-Real-IP`, then
/// `CF-Connecting-IP`, then the literal `"unknown"`.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_owned();
            }
        }
    }

    if let Some(real_ip) = header_str(headers, "x-real-ip") {
        let trimmed = real_ip.trim();
        if !trimmed.is_empty() {
            return trimmed.to_owned();
        }
    }

    if let Some(cf_ip) = header_str(headers, "cf-connecting-ip") {
        let trimmed = cf_ip.trim();
        if !trimmed.is_empty() {
            return trimmed.to_owned();
        }
    }

    "unknown".to_owned()
}

/// Compute the weak browser fingerprint for a request
///
/// SHA-256 over the concatenated values of `User-Agent`, `Accept-Language`,
/// `Accept-Encoding`, `Connection`, and `DNT` (missing headers contribute an
/// empty string), base64-encoded and truncated to 16 characters. Same
/// browser/config on the same machine reproduces it; it is explicitly not
/// cryptographically unique.
#[must_use]
pub fn browser_fingerprint(headers: &HeaderMap) -> String {
    let mut hasher = Sha256::new();
    for name in FINGERPRINT_HEADERS {
        hasher.update(header_str(headers, name).unwrap_or(""));
    }

    let mut encoded = STANDARD.encode(hasher.finalize());
    encoded.truncate(FINGERPRINT_LENGTH);
    encoded
}

/// Whether an IP falls in an RFC1918 private range likely shared by many
/// distinct devices (NAT, corporate proxy)
#[must_use]
pub fn is_shared_network(ip: &str) -> bool {
    ip.parse::<Ipv4Addr>().is_ok_and(|addr| {
        let octets = addr.octets();
        octets[0] == 10
            || (octets[0] == 172 && (16..=31).contains(&octets[1]))
            || (octets[0] == 192 && octets[1] == 168)
    })
}

/// First two octets of a dotted-quad IP, used when the full address is a
/// shared-network address
fn ip_prefix(ip: &str) -> String {
    ip.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// Generate a fresh opaque guest id
///
/// `UUIDv4` from the OS RNG. The platform RNG is infallible here, so no
/// pseudo-random fallback path is needed.
#[must_use]
pub fn generate_guest_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Derive the quota-scoping identifier for one request
///
/// Registered and paid callers are identified by their session user id. When
/// no user id is present despite a non-anonymous role, derivation falls back
/// to the anonymous composition. Anonymous composition is controlled by the
/// role's config flags:
///
/// - fingerprinting on, shared network detected: `shared:{fp}:{ip-prefix}`
/// - fingerprinting on, routable IP: `{ip}:{fp}`
/// - fingerprinting off: bare `{ip}`
/// - guest cookie on: the above prefixed with `g:{guest_id}:`
#[must_use]
pub fn derive_identifier(
    role: &Role,
    session: Option<&Session>,
    headers: &HeaderMap,
    config: &RateLimitConfig,
    existing_guest_id: Option<&str>,
) -> DerivedIdentity {
    if *role != Role::Anonymous {
        if let Some(user) = session.and_then(|s| s.user.as_ref()) {
            if !user.id.is_empty() {
                return DerivedIdentity {
                    identifier: user.id.clone(),
                    issued_guest_id: None,
                };
            }
        }
        // No user id despite an authenticated role: fall through to the
        // anonymous composition rather than collapsing all such callers
        // onto one empty key.
    }

    let ip = client_ip(headers);
    let core = if config.use_browser_fingerprint {
        let fp = browser_fingerprint(headers);
        if config.handle_shared_networks && is_shared_network(&ip) {
            format!("shared:{fp}:{}", ip_prefix(&ip))
        } else {
            format!("{ip}:{fp}")
        }
    } else {
        ip
    };

    if !config.use_guest_cookie {
        return DerivedIdentity {
            identifier: core,
            issued_guest_id: None,
        };
    }

    match existing_guest_id.filter(|id| !id.is_empty()) {
        Some(guest_id) => DerivedIdentity {
            identifier: format!("g:{guest_id}:{core}"),
            issued_guest_id: None,
        },
        None => {
            let guest_id = generate_guest_id();
            let identifier = format!("g:{guest_id}:{core}");
            DerivedIdentity {
                identifier,
                issued_guest_id: Some(guest_id),
            }
        }
    }
}
