//! Refresh-token cookie handling.

use axum::http::{header, HeaderMap};
use chrono::Duration;

/// Cookie name for the refresh token (long-lived, days).
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Build the Set-Cookie value delivering a refresh token.
///
/// HTTP-only and SameSite=Lax always; `Secure` only when the deployment
/// terminates TLS. Max-Age follows the refresh-token TTL so the cookie and
/// the token it carries expire together.
pub fn build_refresh_cookie(token: &str, max_age: Duration, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        REFRESH_COOKIE_NAME,
        token,
        max_age.num_seconds(),
        if secure { "; Secure" } else { "" }
    )
}

/// Overwrite the refresh cookie with an immediately-expiring empty value.
pub fn clear_refresh_cookie(secure: bool) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{}",
        REFRESH_COOKIE_NAME,
        if secure { "; Secure" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn get_cookie_finds_among_many() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; refreshToken=abc.def.ghi; lang=en"),
        );
        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), Some("abc.def.ghi"));
        assert_eq!(get_cookie(&headers, "theme"), Some("dark"));
    }

    #[test]
    fn get_cookie_tolerates_spacing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("  refreshToken = abc ; other=1"),
        );
        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), Some("abc"));
    }

    #[test]
    fn get_cookie_missing() {
        let headers = HeaderMap::new();
        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), None);
    }

    #[test]
    fn refresh_cookie_attributes() {
        let cookie = build_refresh_cookie("tok", Duration::days(7), false);
        assert_eq!(
            cookie,
            "refreshToken=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=604800"
        );
        assert!(!cookie.contains("Secure"));

        let secure = build_refresh_cookie("tok", Duration::days(7), true);
        assert!(secure.ends_with("; Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_refresh_cookie(false);
        assert_eq!(cookie, "refreshToken=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
    }
}
