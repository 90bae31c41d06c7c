// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the gateway.

pub mod cookies;
pub mod http;
pub mod proxy;

use axum::extract::DefaultBodyLimit;
use axum::routing::{any, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::GatewayState;

/// Build the axum `Router` with all gateway routes.
///
/// Gateway-owned endpoints live under the mount next to the catch-all
/// proxy; more specific routes win.
pub fn build_router(state: GatewayState) -> Router {
    let mount = state.config.mount.clone();
    let body_limit = state.config.max_body_bytes;

    Router::new()
        // Health (no auth, outside the mount)
        .route("/health", get(http::health))
        // Session lifecycle
        .route(&format!("{mount}/auth/login"), post(http::login))
        .route(&format!("{mount}/auth/logout"), post(http::logout))
        .route(&format!("{mount}/auth/session"), get(http::session))
        // Profile
        .route(&format!("{mount}/profile"), get(http::get_profile).put(http::put_profile))
        // Credential-free game-data relay
        .route(&format!("{mount}/otoge/{{*rest}}"), any(proxy::forward_otoge))
        // Everything else under the mount goes upstream
        .route(&format!("{mount}/{{*rest}}"), any(proxy::forward))
        .fallback(http::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
