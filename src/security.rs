// ABOUTME: Cookie handling utilities for the guest identity contract
// ABOUTME: Reads request cookies and builds the guest_id Set-Cookie header value
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

/// Cookie parsing and construction helpers
pub mod cookies {
    use crate::constants::cookies::{GUEST_COOKIE_MAX_AGE_SECS, GUEST_COOKIE_NAME};
    use http::HeaderMap;

    /// Extract a cookie value from the request `Cookie` header(s)
    #[must_use]
    pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
        headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=')?;
                (key.trim() == name).then(|| value.trim().to_owned())
            })
            .next()
    }

    /// Build the `Set-Cookie` value persisting a guest identity
    ///
    /// Cookie security: `HttpOnly` prevents XSS, `SameSite=Lax` prevents CSRF,
    /// `Secure` is appended in production deployments. Max-Age is 30 days.
    #[must_use]
    pub fn build_guest_cookie(value: &str, secure: bool) -> String {
        let mut cookie = format!(
            "{GUEST_COOKIE_NAME}={value}; HttpOnly; Path=/; SameSite=Lax; Max-Age={GUEST_COOKIE_MAX_AGE_SECS}"
        );
        if secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::cookies::{build_guest_cookie, get_cookie_value};
    use http::{HeaderMap, HeaderValue};

    #[test]
    fn test_get_cookie_value_parses_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::COOKIE,
            HeaderValue::from_static("theme=dark; guest_id=abc-123; lang=en"),
        );
        assert_eq!(
            get_cookie_value(&headers, "guest_id"),
            Some("abc-123".to_owned())
        );
        assert_eq!(get_cookie_value(&headers, "theme"), Some("dark".to_owned()));
        assert_eq!(get_cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_get_cookie_value_scans_all_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(http::header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(
            http::header::COOKIE,
            HeaderValue::from_static("guest_id=xyz"),
        );
        assert_eq!(get_cookie_value(&headers, "guest_id"), Some("xyz".to_owned()));
    }

    #[test]
    fn test_build_guest_cookie_attributes() {
        let cookie = build_guest_cookie("tok", false);
        assert_eq!(
            cookie,
            "guest_id=tok; HttpOnly; Path=/; SameSite=Lax; Max-Age=2592000"
        );
        assert!(build_guest_cookie("tok", true).ends_with("; Secure"));
    }
}
