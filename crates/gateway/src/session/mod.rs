// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session records and the store that holds them.
//!
//! A session pairs the caller's public identity with the upstream credential
//! pair. The browser only ever holds an opaque [`SessionHandle`] inside an
//! encrypted cookie; the credential pair never leaves the gateway.

pub mod memory;
pub mod persist;
pub mod seal;
pub mod sweeper;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::identity::UserIdentity;

/// Upstream access/refresh token pair with its absolute expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as milliseconds since Unix epoch, fixed when the pair was issued.
    pub expires_at_ms: u64,
}

impl CredentialPair {
    /// Build a pair from an upstream-declared lifetime observed at `issued_at_ms`.
    pub fn issued(
        access_token: String,
        refresh_token: String,
        issued_at_ms: u64,
        expires_in_secs: u64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at_ms: issued_at_ms.saturating_add(expires_in_secs.saturating_mul(1000)),
        }
    }

    /// A pair is expired from its expiry instant onward.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at_ms", &self.expires_at_ms)
            .finish()
    }
}

/// Server-side session: public identity plus the secure credential pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub public: UserIdentity,
    pub secure: CredentialPair,
    pub created_at_ms: u64,
}

impl SessionRecord {
    pub fn new(public: UserIdentity, secure: CredentialPair) -> Self {
        Self { public, secure, created_at_ms: epoch_ms() }
    }
}

/// Opaque identifier of a session record.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionHandle {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a prefix: enough to correlate log lines, not enough to replay.
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "SessionHandle({prefix}…)")
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        f.write_str(&prefix)
    }
}

/// Shared, concurrently accessed session persistence.
///
/// Every mutation replaces whole records; readers never observe a credential
/// pair that is half old and half new.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Store a new record under a fresh handle.
    async fn create(&self, record: SessionRecord) -> anyhow::Result<SessionHandle>;

    /// Look up a record by handle.
    async fn load(&self, handle: &SessionHandle) -> anyhow::Result<Option<SessionRecord>>;

    /// Replace the credential pair if the stored refresh token still equals
    /// `expected_refresh`. Returns `false` when the record is gone or was
    /// already rotated by someone else.
    async fn rotate(
        &self,
        handle: &SessionHandle,
        expected_refresh: &str,
        pair: CredentialPair,
    ) -> anyhow::Result<bool>;

    /// Delete a record. Returns whether one existed.
    async fn remove(&self, handle: &SessionHandle) -> anyhow::Result<bool>;

    /// Delete every record created before `cutoff_ms`. Returns how many.
    async fn purge_older_than(&self, cutoff_ms: u64) -> anyhow::Result<usize>;

    /// Number of live records.
    async fn count(&self) -> usize;
}

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
