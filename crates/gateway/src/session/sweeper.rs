// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background expiry of sessions older than the configured max age.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::session::{epoch_ms, SessionStore};
use crate::state::GatewayState;

/// Spawn the sweeper for the gateway's session store.
pub fn spawn_session_sweeper(state: &GatewayState) -> tokio::task::JoinHandle<()> {
    spawn_sweeper(
        Arc::clone(&state.sessions),
        state.config.sweep_interval(),
        state.config.session_max_age(),
        state.shutdown.clone(),
    )
}

/// Shortest interval between sweeps.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically purge records created more than `max_age` ago.
pub fn spawn_sweeper(
    sessions: Arc<dyn SessionStore>,
    every: Duration,
    max_age: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        // `interval` panics on a zero period.
        let mut timer = tokio::time::interval(every.max(MIN_INTERVAL));
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            let cutoff = epoch_ms().saturating_sub(max_age.as_millis() as u64);
            match sessions.purge_older_than(cutoff).await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "expired sessions swept"),
                Err(e) => tracing::warn!(err = %e, "session sweep failed"),
            }
        }
    })
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
