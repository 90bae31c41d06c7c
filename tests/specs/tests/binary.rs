// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Smoke tests that spawn the real `leporid-gateway` binary.

use std::sync::Arc;
use std::time::Duration;

use leporid_gateway::identity::UserIdentity;
use leporid_gateway::test_support::FakeUpstream;
use leporid_mirror::{AuthMirror, NotificationCenter, SessionClient};
use leporid_specs::GatewayProcess;

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn health_reports_running() -> anyhow::Result<()> {
    let upstream = FakeUpstream::spawn().await?;
    let gateway = GatewayProcess::start(&upstream.base_url())?;
    gateway.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/health", gateway.base_url())).await?.json().await?;
    assert_eq!(resp["status"], "running");
    assert_eq!(resp["sessions"], 0);
    Ok(())
}

#[tokio::test]
async fn login_and_proxy_through_binary() -> anyhow::Result<()> {
    let upstream = FakeUpstream::spawn().await?;
    upstream.add_user(3, "bob", "hunter2");
    let gateway = GatewayProcess::start(&upstream.base_url())?;
    gateway.wait_healthy(TIMEOUT).await?;

    let client = SessionClient::new(&gateway.base_url(), Arc::new(NotificationCenter::default()))?;
    let mirror = AuthMirror::new(client, "/api");
    let user = mirror.login("bob", "hunter2").await?;
    assert_eq!(user.id, 3);

    let me: UserIdentity = mirror.client().get("/api/users/me").await?;
    assert_eq!(me.username, "bob");
    assert_eq!(upstream.forwarded(), 0);
    assert_eq!(upstream.me_calls(), 2);

    mirror.clear().await;
    assert!(!mirror.is_logged_in());
    Ok(())
}

#[tokio::test]
async fn short_secret_exits_with_usage_error() -> anyhow::Result<()> {
    let mut gateway = GatewayProcess::build("http://127.0.0.1:9").secret("too-short").spawn()?;
    let status = gateway.wait_exit(TIMEOUT).await?;
    assert_eq!(status.code(), Some(2));
    Ok(())
}

#[tokio::test]
async fn bad_mount_exits_with_usage_error() -> anyhow::Result<()> {
    let mut gateway = GatewayProcess::build("http://127.0.0.1:9").arg("--mount").arg("api/").spawn()?;
    let status = gateway.wait_exit(TIMEOUT).await?;
    assert_eq!(status.code(), Some(2));
    Ok(())
}
