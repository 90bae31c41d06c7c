// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a fake upstream identity service and
//! gateway builders.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::envelope::Envelope;
use crate::identity::{UserId, UserIdentity};
use crate::session::memory::MemorySessionStore;
use crate::session::seal::Sealer;
use crate::state::GatewayState;

/// Name of the upstream's own session cookie in the fake.
pub const UPSTREAM_COOKIE: &str = "leporid";

/// Mutable behavior and counters of a [`FakeUpstream`].
#[derive(Default)]
pub struct FakeState {
    users: Mutex<HashMap<String, (String, UserIdentity)>>,
    access: Mutex<HashMap<String, UserId>>,
    refresh: Mutex<HashMap<String, UserId>>,
    cookies: Mutex<HashMap<String, UserId>>,
    serial: AtomicU64,
    /// Lifetime (seconds) declared for pairs issued by the password grant.
    pub password_lifetime_secs: AtomicU64,
    /// Lifetime (seconds) declared for pairs issued by the refresh grant.
    pub refresh_lifetime_secs: AtomicU64,
    /// Delay before answering a refresh grant.
    pub refresh_delay_ms: AtomicU64,
    pub password_grants: AtomicUsize,
    pub refresh_grants: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub forwarded: AtomicUsize,
}

/// In-process stand-in for the upstream identity/resource API.
///
/// - `POST /auth/token` issues single-use refresh tokens.
/// - `GET /users/me` accepts a bearer token or the upstream cookie.
/// - `/status/{code}` answers with that status.
/// - `GET /moved` redirects with `302`.
/// - Every other path echoes the request back as JSON.
pub struct FakeUpstream {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
}

impl FakeUpstream {
    pub async fn spawn() -> anyhow::Result<Self> {
        let state = Arc::new(FakeState::default());
        state.password_lifetime_secs.store(3600, Ordering::Relaxed);
        state.refresh_lifetime_secs.store(3600, Ordering::Relaxed);

        let app = Router::new()
            .route("/auth/token", post(token))
            .route("/users/me", get(me))
            .route("/status/{code}", axum::routing::any(status))
            .route("/moved", get(moved))
            .fallback(echo)
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { addr, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn add_user(&self, id: UserId, username: &str, password: &str) -> UserIdentity {
        let identity = UserIdentity {
            id,
            username: username.to_owned(),
            phone: None,
            privileges: vec!["member".to_owned()],
        };
        self.state
            .users
            .lock()
            .insert(username.to_owned(), (password.to_owned(), identity.clone()));
        identity
    }

    /// Mint a raw upstream session cookie value for `id`.
    pub fn issue_cookie(&self, id: UserId) -> String {
        let value = format!("cookie-{}", self.state.serial.fetch_add(1, Ordering::Relaxed));
        self.state.cookies.lock().insert(value.clone(), id);
        value
    }

    /// Invalidate every outstanding refresh token.
    pub fn revoke_refresh_tokens(&self) {
        self.state.refresh.lock().clear();
    }

    /// Invalidate every outstanding access token and cookie.
    pub fn revoke_access(&self) {
        self.state.access.lock().clear();
        self.state.cookies.lock().clear();
    }

    pub fn set_password_lifetime(&self, secs: u64) {
        self.state.password_lifetime_secs.store(secs, Ordering::Relaxed);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.state.refresh_delay_ms.store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn password_grants(&self) -> usize {
        self.state.password_grants.load(Ordering::Relaxed)
    }

    pub fn refresh_grants(&self) -> usize {
        self.state.refresh_grants.load(Ordering::Relaxed)
    }

    pub fn me_calls(&self) -> usize {
        self.state.me_calls.load(Ordering::Relaxed)
    }

    pub fn forwarded(&self) -> usize {
        self.state.forwarded.load(Ordering::Relaxed)
    }
}

impl FakeState {
    fn issue(&self, id: UserId, lifetime_secs: u64) -> serde_json::Value {
        let n = self.serial.fetch_add(1, Ordering::Relaxed);
        let access = format!("access-{n}");
        let refresh = format!("refresh-{n}");
        self.access.lock().insert(access.clone(), id);
        self.refresh.lock().insert(refresh.clone(), id);
        json!({
            "access_token": access,
            "refresh_token": refresh,
            "token_type": "bearer",
            "expires_in": lifetime_secs,
        })
    }

    fn identity(&self, id: UserId) -> Option<UserIdentity> {
        self.users.lock().values().find(|(_, u)| u.id == id).map(|(_, u)| u.clone())
    }
}

fn rejected(detail: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response()
}

async fn token(
    State(state): State<Arc<FakeState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            state.password_grants.fetch_add(1, Ordering::Relaxed);
            let username = params.get("username").cloned().unwrap_or_default();
            let password = params.get("password").cloned().unwrap_or_default();
            let user = state.users.lock().get(&username).cloned();
            match user {
                Some((expected, identity)) if expected == password => {
                    let lifetime = state.password_lifetime_secs.load(Ordering::Relaxed);
                    Json(state.issue(identity.id, lifetime)).into_response()
                }
                _ => rejected("Incorrect username or password"),
            }
        }
        Some("refresh_token") => {
            state.refresh_grants.fetch_add(1, Ordering::Relaxed);
            let delay = state.refresh_delay_ms.load(Ordering::Relaxed);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            let presented = params.get("refresh_token").cloned().unwrap_or_default();
            // Single use: the token is consumed whether or not it was valid.
            let owner = state.refresh.lock().remove(&presented);
            match owner {
                Some(id) => {
                    let lifetime = state.refresh_lifetime_secs.load(Ordering::Relaxed);
                    Json(state.issue(id, lifetime)).into_response()
                }
                None => rejected("Invalid refresh token"),
            }
        }
        _ => (StatusCode::BAD_REQUEST, Json(json!({ "detail": "unsupported grant" })))
            .into_response(),
    }
}

async fn me(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::Relaxed);

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| state.access.lock().get(token).copied());
    let cookie = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| {
            raw.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == UPSTREAM_COOKIE).then(|| value.to_owned())
            })
        })
        .and_then(|value| state.cookies.lock().get(&value).copied());

    match bearer.or(cookie).and_then(|id| state.identity(id)) {
        Some(identity) => Json(Envelope::success(identity)).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(Envelope::failure(401, "unauthorized", "Could not validate credentials")),
        )
            .into_response(),
    }
}

async fn status(axum::extract::Path(code): axum::extract::Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::IM_A_TEAPOT);
    (status, [("content-type", "text/plain")], format!("status {code}")).into_response()
}

async fn moved() -> Response {
    (StatusCode::FOUND, [("location", "/records/elsewhere")]).into_response()
}

async fn echo(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.forwarded.fetch_add(1, Ordering::Relaxed);
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "authorization": header("authorization"),
        "content_type": header("content-type"),
        "accept": header("accept"),
        "cookie": header("cookie"),
        "body": String::from_utf8_lossy(&body),
    }))
    .into_response()
}

/// Gateway config pointed at `upstream_url`.
pub fn gateway_config(upstream_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::test();
    config.upstream_url = upstream_url.to_owned();
    config.upstream_cookie = UPSTREAM_COOKIE.to_owned();
    config
}

/// Gateway state over in-memory stores, returning the concrete session store
/// so tests can inspect and adjust records.
pub fn gateway_state(
    config: GatewayConfig,
) -> anyhow::Result<(GatewayState, Arc<MemorySessionStore>)> {
    let sessions = Arc::new(MemorySessionStore::new(Sealer::derive(
        config.session_secret.as_bytes(),
    )?));
    let profiles = Arc::new(crate::profile::memory::MemoryProfileStore::new());
    let state = GatewayState::new(config, sessions.clone(), profiles)?;
    Ok((state, sessions))
}

/// Serve a gateway on a random port.
pub async fn spawn_gateway(
    state: GatewayState,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = crate::serve(listener, state).await;
    });
    Ok((addr, handle))
}

/// Extension trait to convert any `Display` error into `anyhow::Error`.
pub trait AnyhowExt<T> {
    fn anyhow(self) -> anyhow::Result<T>;
}

impl<T, E: std::fmt::Display> AnyhowExt<T> for Result<T, E> {
    fn anyhow(self) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{e}"))
    }
}
