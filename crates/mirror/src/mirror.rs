// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side mirror of the server session.
//!
//! The flag and cached identity are hints. The server session record is
//! authoritative; whenever a sync fails, or any request through the client
//! is rejected as unauthenticated, the mirror drops back to signed out.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use leporid_gateway::identity::UserIdentity;
use leporid_gateway::transport::cookies::HINT_COOKIE;

use crate::client::{ClientError, SessionClient};
use crate::notify::NotificationKind;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub logged_in: bool,
    pub user: Option<UserIdentity>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

pub struct AuthMirror {
    client: SessionClient,
    mount: String,
    state: Arc<Mutex<AuthSnapshot>>,
    /// Serializes re-synchronization so concurrent navigations share one fetch.
    sync: tokio::sync::Mutex<()>,
}

impl AuthMirror {
    /// Build a mirror whose flag starts from the hint cookie.
    pub fn new(mut client: SessionClient, mount: &str) -> Self {
        let logged_in = client.cookie(HINT_COOKIE).is_some_and(|v| v == "true");
        let state = client.attach_auth(AuthSnapshot { logged_in, user: None });
        Self {
            client,
            mount: mount.trim_end_matches('/').to_owned(),
            state,
            sync: tokio::sync::Mutex::new(()),
        }
    }

    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.lock().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.lock().logged_in
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.state.lock().user.clone()
    }

    fn set(&self, user: Option<UserIdentity>) {
        let mut state = self.state.lock();
        state.logged_in = user.is_some();
        state.user = user;
    }

    /// Fetch the current identity from the gateway session.
    ///
    /// On any failure both the flag and the cached identity are cleared.
    pub async fn fetch(&self) -> Result<UserIdentity, ClientError> {
        match self.client.get::<UserIdentity>(&format!("{}/auth/session", self.mount)).await {
            Ok(user) => {
                self.set(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                tracing::debug!(err = %e, "session sync failed");
                self.set(None);
                Err(e)
            }
        }
    }

    /// Re-synchronize once when the flag is set but no identity is cached.
    /// Returns the flag afterwards.
    pub async fn lazy_fetch(&self) -> bool {
        let _gate = self.sync.lock().await;
        let needs_sync = {
            let state = self.state.lock();
            state.logged_in && state.user.is_none()
        };
        if needs_sync {
            let _ = self.fetch().await;
        }
        self.is_logged_in()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserIdentity, ClientError> {
        let path = format!("{}/auth/login", self.mount);
        let user: UserIdentity =
            self.client.post(&path, &Credentials { username, password }).await?;
        self.set(Some(user.clone()));
        self.client.notifier().notify(NotificationKind::Success, "Login successful");
        Ok(user)
    }

    /// Sign out. Local state is reset even if the gateway cannot be reached.
    pub async fn clear(&self) {
        let path = format!("{}/auth/logout", self.mount);
        let result =
            self.client.call::<serde_json::Value, ()>(reqwest::Method::POST, &path, None).await;
        if let Err(e) = result {
            tracing::debug!(err = %e, "logout request failed");
        }
        self.set(None);
    }
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
