// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session persistence: sealed records saved to a JSON file with atomic writes.

use std::collections::HashMap;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::identity::UserIdentity;

/// On-disk snapshot of every live session, keyed by handle.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PersistedSessions {
    pub sessions: HashMap<String, PersistedSession>,
}

/// One session as written to disk. The credential pair stays sealed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub public: UserIdentity,
    /// Base64 of `nonce || ciphertext || tag`.
    pub sealed: String,
    pub created_at_ms: u64,
}

impl PersistedSession {
    pub fn new(public: UserIdentity, sealed: &[u8], created_at_ms: u64) -> Self {
        Self { public, sealed: STANDARD.encode(sealed), created_at_ms }
    }

    pub fn sealed_bytes(&self) -> anyhow::Result<Vec<u8>> {
        Ok(STANDARD.decode(&self.sealed)?)
    }
}

/// Load persisted sessions from a JSON file.
pub fn load(path: &Path) -> anyhow::Result<PersistedSessions> {
    read_json(path)
}

/// Save persisted sessions atomically.
pub fn save(path: &Path, sessions: &PersistedSessions) -> anyhow::Result<()> {
    write_json(path, sessions)
}

/// Read a JSON document written by [`write_json`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| anyhow::anyhow!("corrupt store file {}: {e}", path.display()))
}

/// Replace `path` with `value` as JSON. Readers see the old file or the new
/// one, never a partial write.
///
/// The document is staged in a temp file in the same directory, flushed to
/// disk, then renamed over `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(staged.as_file_mut(), value)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
