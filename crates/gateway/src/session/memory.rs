// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process session store with sealed credentials and optional file backing.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::identity::UserIdentity;
use crate::session::persist::{self, PersistedSession, PersistedSessions};
use crate::session::seal::Sealer;
use crate::session::{CredentialPair, SessionHandle, SessionRecord, SessionStore};

struct StoredSession {
    public: UserIdentity,
    sealed: Vec<u8>,
    created_at_ms: u64,
}

/// Session store backed by a map behind an async lock.
///
/// Credential pairs are kept sealed even in memory. When a persistence path
/// is set, every mutation is written to disk before the call returns.
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, StoredSession>>,
    sealer: Sealer,
    path: Option<PathBuf>,
}

impl MemorySessionStore {
    pub fn new(sealer: Sealer) -> Self {
        Self { records: RwLock::new(HashMap::new()), sealer, path: None }
    }

    /// Open a file-backed store, loading existing records if the file exists.
    ///
    /// Records that fail to decode or authenticate under the current secret
    /// are dropped with a warning.
    pub fn open(sealer: Sealer, path: PathBuf) -> anyhow::Result<Self> {
        let mut records = HashMap::new();
        if path.exists() {
            let persisted = persist::load(&path)?;
            for (handle, entry) in persisted.sessions {
                let sealed = match entry.sealed_bytes() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(err = %e, "dropping undecodable persisted session");
                        continue;
                    }
                };
                if let Err(e) = sealer.open(&sealed) {
                    tracing::warn!(err = %e, "dropping persisted session sealed under another secret");
                    continue;
                }
                records.insert(
                    handle,
                    StoredSession {
                        public: entry.public,
                        sealed,
                        created_at_ms: entry.created_at_ms,
                    },
                );
            }
            tracing::info!(count = records.len(), path = %path.display(), "loaded persisted sessions");
        }
        Ok(Self { records: RwLock::new(records), sealer, path: Some(path) })
    }

    /// Decrypted snapshot of every record.
    pub async fn records(&self) -> anyhow::Result<Vec<(SessionHandle, SessionRecord)>> {
        let records = self.records.read().await;
        records
            .iter()
            .map(|(handle, stored)| {
                Ok((SessionHandle::from(handle.as_str()), self.unseal(stored)?))
            })
            .collect()
    }

    fn unseal(&self, stored: &StoredSession) -> anyhow::Result<SessionRecord> {
        Ok(SessionRecord {
            public: stored.public.clone(),
            secure: self.sealer.open(&stored.sealed)?,
            created_at_ms: stored.created_at_ms,
        })
    }

    /// Write the current map to disk. Called with the write lock held so
    /// snapshots land in mutation order.
    fn flush(&self, records: &HashMap<String, StoredSession>) -> anyhow::Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let snapshot = PersistedSessions {
            sessions: records
                .iter()
                .map(|(handle, stored)| {
                    (
                        handle.clone(),
                        PersistedSession::new(
                            stored.public.clone(),
                            &stored.sealed,
                            stored.created_at_ms,
                        ),
                    )
                })
                .collect(),
        };
        persist::save(path, &snapshot)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, record: SessionRecord) -> anyhow::Result<SessionHandle> {
        let handle = SessionHandle::generate();
        let sealed = self.sealer.seal(&record.secure)?;
        let mut records = self.records.write().await;
        records.insert(
            handle.as_str().to_owned(),
            StoredSession { public: record.public, sealed, created_at_ms: record.created_at_ms },
        );
        if let Err(e) = self.flush(&records) {
            records.remove(handle.as_str());
            return Err(e);
        }
        Ok(handle)
    }

    async fn load(&self, handle: &SessionHandle) -> anyhow::Result<Option<SessionRecord>> {
        let records = self.records.read().await;
        records.get(handle.as_str()).map(|stored| self.unseal(stored)).transpose()
    }

    async fn rotate(
        &self,
        handle: &SessionHandle,
        expected_refresh: &str,
        pair: CredentialPair,
    ) -> anyhow::Result<bool> {
        let sealed = self.sealer.seal(&pair)?;
        let mut records = self.records.write().await;
        let Some(stored) = records.get_mut(handle.as_str()) else {
            return Ok(false);
        };
        let current = self.sealer.open(&stored.sealed)?;
        if current.refresh_token != expected_refresh {
            return Ok(false);
        }
        let previous = std::mem::replace(&mut stored.sealed, sealed);
        if let Err(e) = self.flush(&records) {
            if let Some(stored) = records.get_mut(handle.as_str()) {
                stored.sealed = previous;
            }
            return Err(e);
        }
        Ok(true)
    }

    async fn remove(&self, handle: &SessionHandle) -> anyhow::Result<bool> {
        let mut records = self.records.write().await;
        let existed = records.remove(handle.as_str()).is_some();
        if existed {
            self.flush(&records)?;
        }
        Ok(existed)
    }

    async fn purge_older_than(&self, cutoff_ms: u64) -> anyhow::Result<usize> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, stored| stored.created_at_ms >= cutoff_ms);
        let purged = before - records.len();
        if purged > 0 {
            self.flush(&records)?;
        }
        Ok(purged)
    }

    async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
