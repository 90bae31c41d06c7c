// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cookie builders for the session handle and the client hint.

use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::{CookieJar, PrivateCookieJar};
use time::Duration;

use crate::config::GatewayConfig;
use crate::session::SessionHandle;

/// Readable cookie telling the browser a session probably exists.
pub const HINT_COOKIE: &str = "logged_in";

/// Private (encrypted) cookie carrying the session handle.
pub fn session_cookie(config: &GatewayConfig, handle: &SessionHandle) -> Cookie<'static> {
    Cookie::build((config.session_cookie.clone(), handle.as_str().to_owned()))
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age(config))
        .build()
}

/// Non-HttpOnly hint cookie, `logged_in=true`.
pub fn hint_cookie(config: &GatewayConfig) -> Cookie<'static> {
    Cookie::build((HINT_COOKIE, "true"))
        .http_only(false)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age(config))
        .build()
}

fn max_age(config: &GatewayConfig) -> Duration {
    Duration::seconds(i64::try_from(config.session_max_age_secs).unwrap_or(i64::MAX))
}

fn removal(name: String) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").max_age(Duration::ZERO).build()
}

/// Session handle from the private jar, if any.
pub fn session_handle(jar: &PrivateCookieJar, config: &GatewayConfig) -> Option<SessionHandle> {
    jar.get(&config.session_cookie)
        .map(|c| SessionHandle::from(c.value()))
        .filter(|h| !h.as_str().is_empty())
}

/// Set both cookies for a freshly created session.
pub fn start_session(
    private: PrivateCookieJar,
    plain: CookieJar,
    config: &GatewayConfig,
    handle: &SessionHandle,
) -> (PrivateCookieJar, CookieJar) {
    (private.add(session_cookie(config, handle)), plain.add(hint_cookie(config)))
}

/// Expire the session and hint cookies.
pub fn end_session(
    private: PrivateCookieJar,
    plain: CookieJar,
    config: &GatewayConfig,
) -> (PrivateCookieJar, CookieJar) {
    (
        private.remove(removal(config.session_cookie.clone())),
        plain.remove(removal(HINT_COOKIE.to_owned())),
    )
}

/// Expire the raw upstream cookie and the hint cookie.
pub fn clear_upstream(plain: CookieJar, config: &GatewayConfig) -> CookieJar {
    plain
        .remove(removal(config.upstream_cookie.clone()))
        .remove(removal(HINT_COOKIE.to_owned()))
}

#[cfg(test)]
#[path = "cookies_tests.rs"]
mod tests;
