// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;
use crate::session::epoch_ms;
use crate::session::memory::MemorySessionStore;
use crate::session::seal::Sealer;
use crate::test_support::FakeUpstream;

fn store() -> anyhow::Result<MemorySessionStore> {
    Ok(MemorySessionStore::new(Sealer::derive(b"0123456789abcdef0123456789abcdef")?))
}

fn request(username: &str, password: &str) -> LoginRequest {
    LoginRequest { username: username.into(), password: password.into() }
}

#[yare::parameterized(
    blank_username = { "", "pw" },
    whitespace_username = { "   ", "pw" },
    empty_password = { "alice", "" },
)]
fn blank_fields_are_bad_requests(username: &str, password: &str) {
    let err = request(username, password).validate().err();
    assert_eq!(err.map(|e| e.code), Some(ErrorCode::BadRequest));
}

#[tokio::test]
async fn valid_credentials_create_a_session() -> anyhow::Result<()> {
    let upstream = FakeUpstream::spawn().await?;
    let alice = upstream.add_user(1, "alice", "pw");
    upstream.set_password_lifetime(900);
    let client = UpstreamClient::new(&upstream.base_url(), Duration::from_secs(2))?;
    let store = store()?;

    let before = epoch_ms();
    let (handle, identity) = login(&store, &client, request("alice", "pw")).await?;
    assert_eq!(identity, alice);

    let record = store.load(&handle).await?.ok_or_else(|| anyhow::anyhow!("no record"))?;
    assert_eq!(record.public, alice);
    let expected = before + 900_000;
    assert!(record.secure.expires_at_ms >= expected);
    assert!(record.secure.expires_at_ms < expected + 5_000);
    Ok(())
}

#[tokio::test]
async fn username_is_sent_upstream_unmodified() -> anyhow::Result<()> {
    let upstream = FakeUpstream::spawn().await?;
    upstream.add_user(1, " alice ", "pw");
    let client = UpstreamClient::new(&upstream.base_url(), Duration::from_secs(2))?;
    let store = store()?;

    let (_, identity) = login(&store, &client, request(" alice ", "pw")).await?;
    assert_eq!(identity.username, " alice ");

    let trimmed = login(&store, &client, request("alice", "pw")).await.err();
    assert_eq!(trimmed.map(|e| e.code), Some(ErrorCode::Unauthenticated));
    Ok(())
}

#[tokio::test]
async fn bad_password_creates_nothing_and_leaks_nothing() -> anyhow::Result<()> {
    let upstream = FakeUpstream::spawn().await?;
    upstream.add_user(1, "alice", "pw");
    let client = UpstreamClient::new(&upstream.base_url(), Duration::from_secs(2))?;
    let store = store()?;

    let err = login(&store, &client, request("alice", "wrong"))
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected failure"))?;
    assert_eq!(err.code, ErrorCode::Unauthenticated);
    assert_eq!(err.message, LOGIN_FAILED);
    assert_eq!(store.count().await, 0);
    Ok(())
}

#[tokio::test]
async fn unreachable_upstream_is_the_same_generic_failure() -> anyhow::Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    let client = UpstreamClient::new(&format!("http://{addr}"), Duration::from_millis(500))?;
    let store = store()?;

    let err = login(&store, &client, request("alice", "pw"))
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected failure"))?;
    assert_eq!(err.code, ErrorCode::Unauthenticated);
    assert_eq!(err.message, LOGIN_FAILED);
    assert_eq!(store.count().await, 0);
    Ok(())
}

#[tokio::test]
async fn blank_fields_never_reach_upstream() -> anyhow::Result<()> {
    let upstream = FakeUpstream::spawn().await?;
    let client = UpstreamClient::new(&upstream.base_url(), Duration::from_secs(2))?;
    let store = store()?;

    let err = login(&store, &client, request(" ", "pw")).await.err();
    assert_eq!(err.map(|e| e.code), Some(ErrorCode::BadRequest));
    assert_eq!(upstream.password_grants(), 0);
    Ok(())
}

#[test]
fn debug_hides_password() {
    let shown = format!("{:?}", request("alice", "hunter2"));
    assert!(shown.contains("alice"));
    assert!(!shown.contains("hunter2"));
}
