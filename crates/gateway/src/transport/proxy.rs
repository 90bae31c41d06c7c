// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticating catch-all forwarder.

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::{CookieJar, PrivateCookieJar};

use crate::error::{ErrorCode, GatewayError};
use crate::state::GatewayState;
use crate::transport::cookies;
use crate::upstream::UpstreamClient;

/// Upstream URL for an inbound request: mount prefix removed, remainder
/// joined onto `base`, raw query string appended unchanged.
pub fn rewrite_target(base: &str, mount: &str, uri: &Uri) -> String {
    let path = uri.path();
    let rest = path.strip_prefix(mount).unwrap_or(path);
    let rest = rest.strip_prefix('/').unwrap_or(rest);

    let mut target = format!("{}/{}", base.trim_end_matches('/'), rest);
    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// Inbound headers that travel upstream. Cookies never do.
fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in [AUTHORIZATION, CONTENT_TYPE, ACCEPT] {
        if let Some(value) = inbound.get(&name) {
            headers.insert(name, value.clone());
        }
    }
    headers
}

/// Forward any request under the mount to the upstream.
///
/// A request with a session is only ever sent with a non-expired access
/// token; when refresh fails the request is not forwarded at all.
pub async fn forward(
    State(state): State<GatewayState>,
    private: PrivateCookieJar,
    plain: CookieJar,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let config = &state.config;
    let mut outbound = outbound_headers(&headers);

    if let Some(handle) = cookies::session_handle(&private, config) {
        match state.refresher.bearer_for(&handle).await {
            Ok(Some(token)) => match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    outbound.insert(AUTHORIZATION, value);
                }
                Err(e) => return GatewayError::internal(e).into_response(),
            },
            Ok(None) => {
                tracing::debug!(%handle, "session cookie without record");
            }
            Err(e) if e.code.is_authentication() => {
                let (private, plain) = cookies::end_session(private, plain, config);
                return (private, plain, e).into_response();
            }
            Err(e) => return e.into_response(),
        }
    }

    let target = rewrite_target(state.upstream.base_url(), &config.mount, &uri);
    relay(&state.upstream, config.max_body_bytes, method, &uri, &target, outbound, body).await
}

/// Relay requests under `{mount}/otoge` to the game-data API.
///
/// No session is consulted and no credential is attached; only the
/// allow-listed inbound headers travel.
pub async fn forward_otoge(
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let Some(ref otoge) = state.otoge else {
        return ErrorCode::NotFound.with("no such route").into_response();
    };
    let config = &state.config;
    let prefix = format!("{}/otoge", config.mount);
    let target = rewrite_target(otoge.base_url(), &prefix, &uri);
    let outbound = outbound_headers(&headers);
    relay(otoge, config.max_body_bytes, method, &uri, &target, outbound, body).await
}

async fn relay(
    upstream: &UpstreamClient,
    max_body_bytes: usize,
    method: Method,
    uri: &Uri,
    target: &str,
    outbound: HeaderMap,
    body: Body,
) -> Response {
    // GET bodies are never read.
    let body = if method == Method::GET {
        None
    } else {
        match axum::body::to_bytes(body, max_body_bytes).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!(err = %e, "request body rejected");
                return ErrorCode::BadRequest
                    .with("request body unreadable or too large")
                    .into_response();
            }
        }
    };

    match upstream.forward(method.clone(), target, outbound, body).await {
        Ok(relayed) => {
            tracing::debug!(%method, path = uri.path(), status = relayed.status, "proxied");
            let status = StatusCode::from_u16(relayed.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut response = (status, relayed.body).into_response();
            response.headers_mut().remove(CONTENT_TYPE);
            if let Some(content_type) = relayed.content_type {
                response.headers_mut().insert(CONTENT_TYPE, content_type);
            }
            if let Some(location) = relayed.location {
                response.headers_mut().insert(LOCATION, location);
            }
            response
        }
        Err(e) => {
            tracing::warn!(%method, path = uri.path(), err = %e, "upstream request failed");
            ErrorCode::UpstreamUnavailable.with("upstream unavailable").into_response()
        }
    }
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
