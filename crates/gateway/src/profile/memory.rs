// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::identity::UserId;
use crate::profile::{AccountInput, LinkedAccount, Preference, ProfileStore};
use crate::session::epoch_ms;
use crate::session::persist::{read_json, write_json};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileData {
    preferences: HashMap<UserId, Preference>,
    accounts: BTreeMap<i64, LinkedAccount>,
    next_account_id: i64,
}

/// Profile store held in memory, optionally mirrored to a JSON file.
pub struct MemoryProfileStore {
    data: RwLock<ProfileData>,
    path: Option<PathBuf>,
}

impl Default for MemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self { data: RwLock::new(ProfileData { next_account_id: 1, ..Default::default() }), path: None }
    }

    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let data = if path.exists() {
            let mut data: ProfileData = read_json(&path)?;
            let max_id = data.accounts.keys().next_back().copied().unwrap_or(0);
            data.next_account_id = data.next_account_id.max(max_id + 1);
            data
        } else {
            ProfileData { next_account_id: 1, ..Default::default() }
        };
        Ok(Self { data: RwLock::new(data), path: Some(path) })
    }

    fn flush(&self, data: &ProfileData) -> anyhow::Result<()> {
        match self.path {
            Some(ref path) => write_json(path, data),
            None => Ok(()),
        }
    }
}

fn owned_by(data: &ProfileData, user: UserId) -> Vec<LinkedAccount> {
    data.accounts.values().filter(|a| a.user_id == user).cloned().collect()
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn preference(&self, user: UserId) -> anyhow::Result<Option<Preference>> {
        Ok(self.data.read().await.preferences.get(&user).cloned())
    }

    async fn preference_or_insert(
        &self,
        user: UserId,
        initial: Preference,
    ) -> anyhow::Result<Preference> {
        if let Some(existing) = self.data.read().await.preferences.get(&user) {
            return Ok(existing.clone());
        }
        let mut data = self.data.write().await;
        if let Some(existing) = data.preferences.get(&user) {
            return Ok(existing.clone());
        }
        data.preferences.insert(user, initial.clone());
        self.flush(&data)?;
        tracing::debug!(user_id = user, "default preference created");
        Ok(initial)
    }

    async fn replace_preference(&self, preference: Preference) -> anyhow::Result<()> {
        let mut data = self.data.write().await;
        data.preferences.insert(preference.user_id, preference);
        self.flush(&data)
    }

    async fn accounts(&self, user: UserId) -> anyhow::Result<Vec<LinkedAccount>> {
        Ok(owned_by(&*self.data.read().await, user))
    }

    async fn reconcile_accounts(
        &self,
        user: UserId,
        incoming: Vec<AccountInput>,
    ) -> anyhow::Result<Vec<LinkedAccount>> {
        let mut data = self.data.write().await;
        let now = epoch_ms();

        // Work on a copy so a failed flush leaves the map untouched.
        let mut accounts = data.accounts.clone();
        let mut next_id = data.next_account_id;
        let mut kept = Vec::new();

        for input in incoming {
            let existing = input
                .id
                .and_then(|id| accounts.get_mut(&id))
                .filter(|a| a.user_id == user);
            match existing {
                Some(account) => {
                    account.server_id = input.server_id;
                    account.credentials = input.credentials;
                    account.enabled = input.enabled;
                    account.updated_at_ms = now;
                    kept.push(account.id);
                }
                None => {
                    let id = next_id;
                    next_id += 1;
                    accounts.insert(
                        id,
                        LinkedAccount {
                            id,
                            user_id: user,
                            server_id: input.server_id,
                            credentials: input.credentials,
                            enabled: input.enabled,
                            created_at_ms: now,
                            updated_at_ms: now,
                        },
                    );
                    kept.push(id);
                }
            }
        }
        accounts.retain(|id, a| a.user_id != user || kept.contains(id));

        let previous = std::mem::replace(&mut data.accounts, accounts);
        let previous_next = std::mem::replace(&mut data.next_account_id, next_id);
        if let Err(e) = self.flush(&data) {
            data.accounts = previous;
            data.next_account_id = previous_next;
            return Err(e);
        }
        Ok(owned_by(&data, user))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
