// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leporid gateway: session-bound authenticating proxy in front of the
//! Leporid identity/resource API.

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod profile;
pub mod session;
pub mod state;
pub mod test_support;
pub mod transport;
pub mod upstream;

use std::sync::Once;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::config::GatewayConfig;
use crate::session::sweeper::spawn_session_sweeper;
use crate::state::GatewayState;
use crate::transport::build_router;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Initialize tracing/logging from config.
///
/// Uses `try_init` so it's safe to call multiple times (e.g. from tests).
pub fn init_tracing(config: &GatewayConfig) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

/// Run the gateway until Ctrl-C.
pub async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = GatewayState::from_config(config)?;

    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            shutdown.cancel();
        }
    });

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        upstream = state.upstream.base_url(),
        mount = %state.config.mount,
        "leporid-gateway listening on {addr}"
    );
    serve(listener, state).await
}

/// Serve on an already-bound listener until `state.shutdown` is cancelled.
pub async fn serve(listener: TcpListener, state: GatewayState) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    spawn_session_sweeper(&state);
    let router = build_router(state);
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;
    Ok(())
}
