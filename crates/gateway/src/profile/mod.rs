// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user profile: display preference plus linked game-server accounts.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// Image ids seeded into a new preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDefaults {
    pub character_id: String,
    pub mask_id: String,
    pub background_id: String,
    pub frame_id: String,
    pub passname_id: String,
}

fn default_qr_size() -> i32 {
    15
}

fn default_info_color() -> String {
    "#fee37c".to_owned()
}

fn yes() -> bool {
    true
}

/// Display and rendering preference of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preference {
    #[serde(rename = "user_id", default)]
    pub user_id: UserId,
    #[serde(default)]
    pub maimai_version: String,
    #[serde(default)]
    pub simplified_code: String,
    #[serde(default)]
    pub character_name: String,
    #[serde(default)]
    pub friend_code: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub dx_rating: String,
    #[serde(default = "default_qr_size")]
    pub qr_size: i32,
    #[serde(default)]
    pub mask_type: i32,
    #[serde(default = "default_info_color")]
    pub chara_info_color: String,
    #[serde(default = "yes")]
    pub dynamic_rating: bool,
    #[serde(default = "yes")]
    pub show_date: bool,
    pub character_id: String,
    pub mask_id: String,
    pub background_id: String,
    pub frame_id: String,
    pub passname_id: String,
}

impl Preference {
    /// Preference a user gets before they ever save one.
    pub fn initial(user_id: UserId, images: &ImageDefaults) -> Self {
        Self {
            user_id,
            maimai_version: String::new(),
            simplified_code: String::new(),
            character_name: String::new(),
            friend_code: String::new(),
            display_name: String::new(),
            dx_rating: String::new(),
            qr_size: default_qr_size(),
            mask_type: 0,
            chara_info_color: default_info_color(),
            dynamic_rating: true,
            show_date: true,
            character_id: images.character_id.clone(),
            mask_id: images.mask_id.clone(),
            background_id: images.background_id.clone(),
            frame_id: images.frame_id.clone(),
            passname_id: images.passname_id.clone(),
        }
    }
}

/// A game-server account linked to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub id: i64,
    pub user_id: UserId,
    pub server_id: i64,
    pub credentials: String,
    pub enabled: bool,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Incoming account row. Rows without an id, or with an id the user does
/// not own, are inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInput {
    #[serde(default)]
    pub id: Option<i64>,
    pub server_id: i64,
    pub credentials: String,
    #[serde(default = "yes")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub preference: Preference,
    pub accounts: Vec<LinkedAccount>,
}

/// Body of `PUT {mount}/profile`. Absent parts are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub preference: Option<Preference>,
    #[serde(default)]
    pub accounts: Option<Vec<AccountInput>>,
}

/// Profile persistence keyed by user id.
#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    async fn preference(&self, user: UserId) -> anyhow::Result<Option<Preference>>;

    /// Return the stored preference, inserting `initial` first if there is none.
    async fn preference_or_insert(
        &self,
        user: UserId,
        initial: Preference,
    ) -> anyhow::Result<Preference>;

    /// Insert or overwrite the preference for `preference.user_id`.
    async fn replace_preference(&self, preference: Preference) -> anyhow::Result<()>;

    /// Linked accounts of `user`, ordered by id.
    async fn accounts(&self, user: UserId) -> anyhow::Result<Vec<LinkedAccount>>;

    /// Make the user's accounts match `incoming`: update rows with a matching
    /// id, insert the rest, delete rows not mentioned. Applied atomically.
    async fn reconcile_accounts(
        &self,
        user: UserId,
        incoming: Vec<AccountInput>,
    ) -> anyhow::Result<Vec<LinkedAccount>>;
}

/// Current profile, creating the default preference on first access.
pub async fn load_profile(
    store: &dyn ProfileStore,
    user: UserId,
    images: &ImageDefaults,
) -> anyhow::Result<Profile> {
    let preference = store.preference_or_insert(user, Preference::initial(user, images)).await?;
    let accounts = store.accounts(user).await?;
    Ok(Profile { preference, accounts })
}

/// Apply `update` for `user` and return the resulting profile.
pub async fn update_profile(
    store: &dyn ProfileStore,
    user: UserId,
    update: ProfileUpdate,
    images: &ImageDefaults,
) -> anyhow::Result<Profile> {
    if let Some(mut preference) = update.preference {
        // The row always belongs to the caller, whatever the body says.
        preference.user_id = user;
        store.replace_preference(preference).await?;
    }
    let accounts = match update.accounts {
        Some(incoming) => store.reconcile_accounts(user, incoming).await?,
        None => store.accounts(user).await?,
    };
    let preference = store.preference_or_insert(user, Preference::initial(user, images)).await?;
    Ok(Profile { preference, accounts })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
