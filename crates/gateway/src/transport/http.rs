// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the gateway's own endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::{CookieJar, PrivateCookieJar};
use serde::Serialize;

use crate::auth::{self, CallerIdentity, LoginRequest};
use crate::envelope::Envelope;
use crate::error::{ErrorCode, GatewayError};
use crate::profile::{self, ProfileUpdate};
use crate::state::GatewayState;
use crate::transport::cookies;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
}

fn bad_body(rejection: JsonRejection) -> GatewayError {
    tracing::debug!(err = %rejection, "malformed request body");
    ErrorCode::BadRequest.with("malformed request body")
}

// -- Handlers -----------------------------------------------------------------

/// `GET /health`
pub async fn health(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned(), sessions: state.sessions.count().await })
}

/// `POST {mount}/auth/login`
pub async fn login(
    State(state): State<GatewayState>,
    private: PrivateCookieJar,
    plain: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let Json(request) = body.map_err(bad_body)?;
    let (handle, identity) =
        auth::login(state.sessions.as_ref(), &state.upstream, request).await?;
    let (private, plain) = cookies::start_session(private, plain, &state.config, &handle);
    let envelope = Envelope::success(identity).with_message("Login successful");
    Ok((private, plain, Json(envelope)).into_response())
}

/// `POST {mount}/auth/logout`. Idempotent.
pub async fn logout(
    State(state): State<GatewayState>,
    private: PrivateCookieJar,
    plain: CookieJar,
) -> Result<Response, GatewayError> {
    if let Some(handle) = cookies::session_handle(&private, &state.config) {
        if state.sessions.remove(&handle).await.map_err(GatewayError::internal)? {
            tracing::info!(%handle, "session ended by logout");
        }
    }
    let (private, plain) = cookies::end_session(private, plain, &state.config);
    Ok((private, plain, Json(Envelope::empty())).into_response())
}

/// `GET {mount}/auth/session`
pub async fn session(
    State(state): State<GatewayState>,
    private: PrivateCookieJar,
) -> Result<Response, GatewayError> {
    let unauthenticated = || ErrorCode::Unauthenticated.with("not signed in");
    let handle = cookies::session_handle(&private, &state.config).ok_or_else(unauthenticated)?;
    let record = state
        .sessions
        .load(&handle)
        .await
        .map_err(GatewayError::internal)?
        .ok_or_else(unauthenticated)?;
    Ok(Json(Envelope::success(record.public)).into_response())
}

/// `GET {mount}/profile`
pub async fn get_profile(
    State(state): State<GatewayState>,
    CallerIdentity(user): CallerIdentity,
) -> Result<Response, GatewayError> {
    let images = state.config.image_defaults();
    let profile = profile::load_profile(state.profiles.as_ref(), user.id, &images)
        .await
        .map_err(GatewayError::internal)?;
    Ok(Json(Envelope::success(profile)).into_response())
}

/// `PUT {mount}/profile`
pub async fn put_profile(
    State(state): State<GatewayState>,
    CallerIdentity(user): CallerIdentity,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let Json(update) = body.map_err(bad_body)?;
    let images = state.config.image_defaults();
    let profile = profile::update_profile(state.profiles.as_ref(), user.id, update, &images)
        .await
        .map_err(GatewayError::internal)?;
    tracing::info!(user_id = user.id, "profile updated");
    Ok(Json(Envelope::success(profile)).into_response())
}

/// Anything outside the mount.
pub async fn not_found() -> GatewayError {
    ErrorCode::NotFound.with("no such route")
}
