// ============================
// crates/backend-lib/src/middleware/cookies.rs
// ============================
//! Reading the bearer cookie and building the two auth cookies.
use std::time::Duration;

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::CookieSettings;

/// Value of a named cookie from the request headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

fn max_age(ttl: Duration) -> time::Duration {
    time::Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}

fn auth_cookie(
    name: &str,
    value: String,
    http_only: bool,
    secure: bool,
    max_age: time::Duration,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .http_only(http_only)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

/// HTTP-only bearer cookie, living as long as the token it carries
pub fn access_cookie(settings: &CookieSettings, token: String, token_ttl: Duration) -> Cookie<'static> {
    auth_cookie(&settings.access_name, token, true, settings.secure, max_age(token_ttl))
}

/// Script-readable CSRF cookie, living as long as the session
pub fn csrf_cookie(settings: &CookieSettings, csrf_token: String, session_ttl: Duration) -> Cookie<'static> {
    auth_cookie(&settings.csrf_name, csrf_token, false, settings.secure, max_age(session_ttl))
}

/// Jar that overwrites both auth cookies with expired blanks
pub fn cleared_auth_cookies(settings: &CookieSettings) -> CookieJar {
    let expired = time::Duration::ZERO;
    CookieJar::new()
        .add(auth_cookie(&settings.access_name, String::new(), true, settings.secure, expired))
        .add(auth_cookie(&settings.csrf_name, String::new(), false, settings.secure, expired))
}
