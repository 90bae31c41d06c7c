// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Password login: token grant, identity fetch, session creation.

use serde::Deserialize;

use crate::error::{ErrorCode, GatewayError};
use crate::identity::UserIdentity;
use crate::session::{SessionHandle, SessionRecord, SessionStore};
use crate::upstream::{Grant, MeAuth, UpstreamClient};

/// The only message a failed login ever shows.
pub const LOGIN_FAILED: &str = "Invalid username or password";

/// Body of `POST {mount}/auth/login`.
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.username.trim().is_empty() {
            return Err(ErrorCode::BadRequest.with("username is required"));
        }
        if self.password.is_empty() {
            return Err(ErrorCode::BadRequest.with("password is required"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest").field("username", &self.username).finish_non_exhaustive()
    }
}

/// Establish a session for `request`.
///
/// Upstream failures of either step collapse into the same 401 so callers
/// cannot tell a bad password from an unknown user or an outage.
pub async fn login(
    sessions: &dyn SessionStore,
    upstream: &UpstreamClient,
    request: LoginRequest,
) -> Result<(SessionHandle, UserIdentity), GatewayError> {
    request.validate()?;
    let username = request.username;

    let grant = Grant::Password { username: username.clone(), password: request.password };
    let pair = upstream.exchange(&grant).await.map_err(|e| {
        tracing::info!(%username, err = %e, "login rejected at token grant");
        ErrorCode::Unauthenticated.with(LOGIN_FAILED)
    })?;

    let identity = upstream.me(MeAuth::Bearer(&pair.access_token)).await.map_err(|e| {
        tracing::warn!(%username, err = %e, "login identity fetch failed");
        ErrorCode::Unauthenticated.with(LOGIN_FAILED)
    })?;

    let record = SessionRecord::new(identity.clone(), pair);
    let handle = sessions.create(record).await.map_err(GatewayError::internal)?;
    tracing::info!(%handle, user_id = identity.id, "session created");
    Ok((handle, identity))
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
