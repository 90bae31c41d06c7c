// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use tokio_util::sync::CancellationToken;

use crate::auth::refresh::Refresher;
use crate::config::GatewayConfig;
use crate::profile::memory::MemoryProfileStore;
use crate::profile::ProfileStore;
use crate::session::memory::MemorySessionStore;
use crate::session::seal::{derive_cookie_key, Sealer};
use crate::session::SessionStore;
use crate::upstream::UpstreamClient;

/// Shared gateway state. Every field is a handle; cloning is cheap.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub sessions: Arc<dyn SessionStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub upstream: UpstreamClient,
    /// Credential-free relay target, when configured.
    pub otoge: Option<UpstreamClient>,
    pub refresher: Arc<Refresher>,
    pub cookie_key: Key,
    pub shutdown: CancellationToken,
}

impl GatewayState {
    /// Assemble state around explicitly supplied stores.
    pub fn new(
        config: GatewayConfig,
        sessions: Arc<dyn SessionStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> anyhow::Result<Self> {
        let upstream = UpstreamClient::new(&config.upstream_url, config.upstream_timeout())?;
        let refresher = Arc::new(Refresher::new(Arc::clone(&sessions), upstream.clone()));
        let otoge = config
            .otoge_url
            .as_deref()
            .map(|url| UpstreamClient::new(url, config.upstream_timeout()))
            .transpose()?;
        let cookie_key = derive_cookie_key(config.session_secret.as_bytes())?;
        Ok(Self {
            config: Arc::new(config),
            sessions,
            profiles,
            upstream,
            otoge,
            refresher,
            cookie_key,
            shutdown: CancellationToken::new(),
        })
    }

    /// Build the stores described by `config` (file-backed when paths are set).
    pub fn from_config(config: GatewayConfig) -> anyhow::Result<Self> {
        let sealer = Sealer::derive(config.session_secret.as_bytes())?;
        let sessions: Arc<dyn SessionStore> = match config.session_store {
            Some(ref path) => Arc::new(MemorySessionStore::open(sealer, path.clone())?),
            None => Arc::new(MemorySessionStore::new(sealer)),
        };
        let profiles: Arc<dyn ProfileStore> = match config.profile_store {
            Some(ref path) => Arc::new(MemoryProfileStore::open(path.clone())?),
            None => Arc::new(MemoryProfileStore::new()),
        };
        Self::new(config, sessions, profiles)
    }
}

impl FromRef<GatewayState> for Key {
    fn from_ref(state: &GatewayState) -> Self {
        state.cookie_key.clone()
    }
}
