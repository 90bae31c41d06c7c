// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end session lifecycle: login, expiry, refresh, revocation.
//!
//! Requests go through the mirror client to `/api/users/me`, which the
//! gateway proxies and the fake upstream only answers for a live access
//! token. A successful reply therefore proves which credential was sent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use leporid_gateway::identity::UserIdentity;
use leporid_gateway::session::{epoch_ms, SessionStore};
use leporid_mirror::ClientError;
use leporid_specs::Stack;

const LIFETIME_MS: u64 = 3600 * 1000;

fn suffix(token: &str) -> Option<&str> {
    token.rsplit_once('-').map(|(_, n)| n)
}

#[tokio::test]
async fn login_sets_expiry_from_declared_lifetime() -> anyhow::Result<()> {
    let stack = Stack::start().await?;

    let before = epoch_ms();
    stack.mirror.login("alice", "pw").await?;
    let after = epoch_ms();

    let (_, pair) = stack.only_session().await?;
    assert!(pair.expires_at_ms >= before + LIFETIME_MS, "{pair:?}");
    assert!(pair.expires_at_ms <= after + LIFETIME_MS, "{pair:?}");
    assert_eq!(stack.upstream.password_grants(), 1);
    Ok(())
}

#[tokio::test]
async fn request_before_expiry_forwards_without_refresh() -> anyhow::Result<()> {
    let stack = Stack::start().await?;
    stack.mirror.login("alice", "pw").await?;
    let (_, original) = stack.only_session().await?;

    // Just ahead of the clock: still valid when the request lands.
    stack.set_expiry(epoch_ms() + 1000).await?;
    let me: UserIdentity = stack.client().get("/api/users/me").await?;

    assert_eq!(me.id, 1);
    assert_eq!(stack.upstream.refresh_grants(), 0);
    let (_, pair) = stack.only_session().await?;
    assert_eq!(pair.access_token, original.access_token);
    Ok(())
}

#[tokio::test]
async fn request_after_expiry_refreshes_once_and_uses_new_token() -> anyhow::Result<()> {
    let stack = Stack::start().await?;
    stack.mirror.login("alice", "pw").await?;
    let (_, original) = stack.only_session().await?;

    stack.set_expiry(epoch_ms().saturating_sub(1)).await?;
    // The old access token stops working upstream, so only a refreshed one can succeed.
    stack.upstream.revoke_access();

    let me: UserIdentity = stack.client().get("/api/users/me").await?;
    assert_eq!(me.id, 1);
    assert_eq!(stack.upstream.refresh_grants(), 1);

    let (_, pair) = stack.only_session().await?;
    assert_ne!(pair.access_token, original.access_token);
    assert_ne!(pair.refresh_token, original.refresh_token);
    assert!(pair.expires_at_ms > epoch_ms());

    // Fresh pair: the next request does not refresh again.
    let _: UserIdentity = stack.client().get("/api/users/me").await?;
    assert_eq!(stack.upstream.refresh_grants(), 1);
    Ok(())
}

#[tokio::test]
async fn revoked_refresh_token_destroys_session() -> anyhow::Result<()> {
    let stack = Stack::start().await?;
    stack.mirror.login("alice", "pw").await?;
    stack.set_expiry(epoch_ms().saturating_sub(1)).await?;
    stack.upstream.revoke_refresh_tokens();
    let forwarded = stack.upstream.forwarded();

    let err = stack.client().get::<UserIdentity>("/api/users/me").await.err();
    let Some(ClientError::Api(failure)) = err else {
        anyhow::bail!("expected api failure, got {err:?}");
    };
    assert_eq!(failure.code, 401);
    assert_eq!(failure.node.as_deref(), Some("refresh-failed"));

    assert_eq!(stack.sessions.count().await, 0);
    assert_eq!(stack.upstream.refresh_grants(), 1);
    assert_eq!(stack.upstream.forwarded(), forwarded);
    assert_eq!(stack.client().cookie("logged_in"), None);
    assert!(!stack.mirror.is_logged_in());
    assert_eq!(stack.mirror.user(), None);

    // Not retried: a second request has no session left to refresh.
    let _ = stack.client().get::<UserIdentity>("/api/users/me").await;
    assert_eq!(stack.upstream.refresh_grants(), 1);
    Ok(())
}

#[tokio::test]
async fn simultaneous_expired_requests_share_one_refresh() -> anyhow::Result<()> {
    let stack = Stack::start().await?;
    stack.mirror.login("alice", "pw").await?;
    stack.set_expiry(epoch_ms().saturating_sub(1)).await?;
    stack.upstream.revoke_access();
    stack.upstream.set_refresh_delay(Duration::from_millis(200));

    let a = stack.client().clone();
    let b = stack.client().clone();
    let (first, second) = tokio::join!(
        a.get::<UserIdentity>("/api/users/me"),
        b.get::<UserIdentity>("/api/users/me"),
    );

    assert_eq!(first?.id, 1);
    assert_eq!(second?.id, 1);
    assert_eq!(stack.upstream.refresh_grants(), 1);
    assert_eq!(stack.sessions.count().await, 1);
    Ok(())
}

#[tokio::test]
async fn readers_never_see_a_mixed_pair() -> anyhow::Result<()> {
    let stack = Arc::new(Stack::start().await?);
    stack.mirror.login("alice", "pw").await?;
    stack.set_expiry(epoch_ms().saturating_sub(1)).await?;
    stack.upstream.set_refresh_delay(Duration::from_millis(100));

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let stack = Arc::clone(&stack);
        let done = Arc::clone(&done);
        tokio::spawn(async move {
            let mut observed = 0usize;
            while !done.load(Ordering::Relaxed) {
                let (_, pair) = stack.only_session().await?;
                anyhow::ensure!(
                    suffix(&pair.access_token) == suffix(&pair.refresh_token),
                    "mixed pair observed: {pair:?}"
                );
                observed += 1;
                tokio::task::yield_now().await;
            }
            anyhow::Ok(observed)
        })
    };

    let _: UserIdentity = stack.client().get("/api/users/me").await?;
    done.store(true, Ordering::Relaxed);
    let observed = reader.await??;
    assert!(observed > 0);
    assert_eq!(stack.upstream.refresh_grants(), 1);
    Ok(())
}

#[tokio::test]
async fn query_string_is_preserved_byte_for_byte() -> anyhow::Result<()> {
    let stack = Stack::start().await?;
    let raw = "b=2&a=%20x&a=1&flag";
    let echo: serde_json::Value = reqwest::Client::new()
        .get(format!("{}/api/records/list?{raw}", stack.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(echo["path"], "/records/list");
    assert_eq!(echo["query"], raw);
    Ok(())
}
