// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller identity for handlers that need to know who is asking.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::{CookieJar, PrivateCookieJar};

use crate::error::{ErrorCode, GatewayError};
use crate::identity::UserIdentity;
use crate::state::GatewayState;
use crate::transport::cookies;
use crate::upstream::MeAuth;

const REVOKED: &str = "session missing or revoked";

/// Identity of the caller, resolved from (in order) the gateway session,
/// the raw upstream session cookie, or a forwarded `Authorization` header.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub UserIdentity);

/// Rejection that also expires every session cookie the caller sent.
pub struct ResolveRejection {
    error: GatewayError,
    clear: Option<(PrivateCookieJar, CookieJar)>,
}

impl IntoResponse for ResolveRejection {
    fn into_response(self) -> Response {
        match self.clear {
            Some((private, plain)) => (private, plain, self.error).into_response(),
            None => self.error.into_response(),
        }
    }
}

impl From<GatewayError> for ResolveRejection {
    fn from(error: GatewayError) -> Self {
        Self { error, clear: None }
    }
}

impl FromRequestParts<GatewayState> for CallerIdentity {
    type Rejection = ResolveRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &GatewayState,
    ) -> Result<Self, Self::Rejection> {
        let config = &state.config;
        let private = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let plain = CookieJar::from_headers(&parts.headers);

        if let Some(handle) = cookies::session_handle(&private, config) {
            if let Some(record) =
                state.sessions.load(&handle).await.map_err(GatewayError::internal)?
            {
                return Ok(Self(record.public));
            }
        }

        let fetched = if let Some(cookie) = plain.get(&config.upstream_cookie) {
            let auth = MeAuth::Cookie { name: &config.upstream_cookie, value: cookie.value() };
            Some(state.upstream.me(auth).await)
        } else if let Some(value) =
            parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
        {
            Some(state.upstream.me(MeAuth::Authorization(value)).await)
        } else {
            None
        };

        let err = match fetched {
            Some(Ok(identity)) => return Ok(Self(identity)),
            Some(Err(e)) if e.downcast_ref::<reqwest::Error>().is_some() => {
                tracing::warn!(err = %e, "identity fallback could not reach upstream");
                return Err(ErrorCode::UpstreamUnavailable.with("upstream unavailable").into());
            }
            Some(Err(e)) => {
                tracing::info!(err = %e, "identity fallback rejected");
                ErrorCode::Unauthenticated.with(REVOKED)
            }
            None => ErrorCode::Unauthenticated.with("not signed in"),
        };

        let (private, plain) = cookies::end_session(private, plain, config);
        let plain = cookies::clear_upstream(plain, config);
        Err(ResolveRejection { error: err, clear: Some((private, plain)) })
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
