// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight token refresh for stored sessions.
//!
//! Each session handle has its own async gate. A caller that finds the pair
//! expired takes the gate, re-reads the record, and only then talks to the
//! upstream. Callers queued behind it re-read after the gate opens and see
//! either the rotated pair or the deleted session.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{ErrorCode, GatewayError};
use crate::session::{epoch_ms, SessionHandle, SessionStore};
use crate::upstream::{Grant, UpstreamClient};

/// Message for every refresh-class failure.
pub const SESSION_ENDED: &str = "session expired, please sign in again";

type Gate = tokio::sync::Mutex<()>;

/// Hands out a non-expired access token for a session, refreshing if needed.
pub struct Refresher {
    sessions: Arc<dyn SessionStore>,
    upstream: UpstreamClient,
    gates: Mutex<HashMap<String, Weak<Gate>>>,
}

impl Refresher {
    pub fn new(sessions: Arc<dyn SessionStore>, upstream: UpstreamClient) -> Self {
        Self { sessions, upstream, gates: Mutex::new(HashMap::new()) }
    }

    /// Access token to use for `handle`.
    ///
    /// `Ok(None)` when no record exists. A failed refresh deletes the record
    /// and returns `RefreshFailed`; it is never retried here.
    pub async fn bearer_for(&self, handle: &SessionHandle) -> Result<Option<String>, GatewayError> {
        let Some(record) = self.sessions.load(handle).await.map_err(GatewayError::internal)? else {
            return Ok(None);
        };
        if !record.secure.is_expired_at(epoch_ms()) {
            return Ok(Some(record.secure.access_token));
        }

        let gate = self.gate(handle);
        let guard = gate.lock_owned().await;

        // The refresh and its commit run detached so a dropped request cannot
        // stop between upstream rotation and the store write.
        let sessions = Arc::clone(&self.sessions);
        let upstream = self.upstream.clone();
        let handle = handle.clone();
        let task = tokio::spawn(async move {
            let outcome = refresh_locked(sessions.as_ref(), &upstream, &handle).await;
            drop(guard);
            outcome
        });
        task.await.map_err(GatewayError::internal)?.map(Some)
    }

    /// Number of sessions with a live gate.
    pub fn active_gates(&self) -> usize {
        self.gates.lock().values().filter(|g| g.strong_count() > 0).count()
    }

    fn gate(&self, handle: &SessionHandle) -> Arc<Gate> {
        let mut gates = self.gates.lock();
        if let Some(gate) = gates.get(handle.as_str()).and_then(Weak::upgrade) {
            return gate;
        }
        gates.retain(|_, gate| gate.strong_count() > 0);
        let gate = Arc::new(Gate::new(()));
        gates.insert(handle.as_str().to_owned(), Arc::downgrade(&gate));
        gate
    }
}

async fn refresh_locked(
    sessions: &dyn SessionStore,
    upstream: &UpstreamClient,
    handle: &SessionHandle,
) -> Result<String, GatewayError> {
    let Some(record) = sessions.load(handle).await.map_err(GatewayError::internal)? else {
        // A peer's refresh failed, or the user logged out, while we waited.
        return Err(ErrorCode::RefreshFailed.with(SESSION_ENDED));
    };
    if !record.secure.is_expired_at(epoch_ms()) {
        tracing::debug!(%handle, "using pair rotated by a concurrent request");
        return Ok(record.secure.access_token);
    }

    let current = record.secure.refresh_token;
    let grant = Grant::RefreshToken { refresh_token: current.clone() };
    match upstream.exchange(&grant).await {
        Ok(pair) => {
            let access = pair.access_token.clone();
            let expires_at_ms = pair.expires_at_ms;
            if sessions.rotate(handle, &current, pair).await.map_err(GatewayError::internal)? {
                tracing::info!(%handle, user_id = record.public.id, expires_at_ms, "session refreshed");
                return Ok(access);
            }
            // Rotated elsewhere (another gateway sharing the store) or removed.
            match sessions.load(handle).await.map_err(GatewayError::internal)? {
                Some(latest) if !latest.secure.is_expired_at(epoch_ms()) => {
                    tracing::debug!(%handle, "using pair rotated by another writer");
                    Ok(latest.secure.access_token)
                }
                _ => {
                    tracing::warn!(%handle, "session removed during refresh");
                    Err(ErrorCode::RefreshFailed.with(SESSION_ENDED))
                }
            }
        }
        Err(e) => {
            tracing::warn!(%handle, user_id = record.public.id, err = %e, "refresh failed, ending session");
            if let Err(e) = sessions.remove(handle).await {
                tracing::error!(%handle, err = %e, "failed to remove session after refresh failure");
            }
            Err(ErrorCode::RefreshFailed.with(SESSION_ENDED))
        }
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
