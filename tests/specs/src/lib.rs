// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end gateway tests.
//!
//! Two shapes: [`Stack`] runs a fake upstream, an in-process gateway and a
//! mirror client in one runtime so tests can reach into the session store;
//! [`GatewayProcess`] spawns the real `leporid-gateway` binary.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use leporid_gateway::session::memory::MemorySessionStore;
use leporid_gateway::session::{CredentialPair, SessionHandle, SessionStore};
use leporid_gateway::test_support::{gateway_config, gateway_state, spawn_gateway, FakeUpstream};
use leporid_mirror::{AuthMirror, NotificationCenter, SessionClient};

pub use leporid_gateway::ensure_crypto;

/// Session secret handed to spawned gateways.
pub const SECRET: &str = "specs-secret-specs-secret-specs-secret";

/// Resolve the path to the compiled `leporid-gateway` binary.
pub fn gateway_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("leporid-gateway")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

// -- In-process stack ---------------------------------------------------------

/// Fake upstream, gateway and one signed-out mirror client.
pub struct Stack {
    pub upstream: FakeUpstream,
    pub sessions: Arc<MemorySessionStore>,
    pub notifications: NotificationCenter,
    pub mirror: AuthMirror,
    url: String,
}

impl Stack {
    /// Start a stack with user `alice`/`pw` (id 1) registered upstream.
    pub async fn start() -> anyhow::Result<Self> {
        ensure_crypto();
        let upstream = FakeUpstream::spawn().await?;
        upstream.add_user(1, "alice", "pw");

        let (state, sessions) = gateway_state(gateway_config(&upstream.base_url()))?;
        let (addr, _task) = spawn_gateway(state).await?;
        let url = format!("http://{addr}");

        let notifications = NotificationCenter::default();
        let client = SessionClient::new(&url, Arc::new(notifications.clone()))?;
        let mirror = AuthMirror::new(client, "/api");
        Ok(Self { upstream, sessions, notifications, mirror, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn client(&self) -> &SessionClient {
        self.mirror.client()
    }

    /// The only live session and its credential pair.
    pub async fn only_session(&self) -> anyhow::Result<(SessionHandle, CredentialPair)> {
        let mut records = self.sessions.records().await?;
        anyhow::ensure!(records.len() == 1, "expected one session, found {}", records.len());
        let (handle, record) = records.remove(0);
        Ok((handle, record.secure))
    }

    /// Move the stored expiry of the only session to `at_ms`, keeping its tokens.
    pub async fn set_expiry(&self, at_ms: u64) -> anyhow::Result<()> {
        let (handle, pair) = self.only_session().await?;
        let moved = CredentialPair { expires_at_ms: at_ms, ..pair.clone() };
        let swapped = self.sessions.rotate(&handle, &pair.refresh_token, moved).await?;
        anyhow::ensure!(swapped, "session rotated underneath the test");
        Ok(())
    }
}

// -- Spawned binary -----------------------------------------------------------

/// A running `leporid-gateway` process that is killed on drop.
pub struct GatewayProcess {
    child: Child,
    port: u16,
}

/// Builder for the arguments a [`GatewayProcess`] is started with.
pub struct GatewayBuilder {
    upstream_url: String,
    secret: String,
    extra: Vec<String>,
}

impl GatewayBuilder {
    /// Override the session secret.
    pub fn secret(mut self, secret: &str) -> Self {
        self.secret = secret.to_owned();
        self
    }

    /// Append raw command-line arguments.
    pub fn arg(mut self, arg: &str) -> Self {
        self.extra.push(arg.to_owned());
        self
    }

    pub fn spawn(self) -> anyhow::Result<GatewayProcess> {
        let binary = gateway_binary();
        anyhow::ensure!(binary.exists(), "gateway binary not found at {}", binary.display());

        let port = free_port()?;
        let mut args: Vec<String> = vec![
            "--host".into(),
            "127.0.0.1".into(),
            "--port".into(),
            port.to_string(),
            "--upstream-url".into(),
            self.upstream_url,
            "--log-format".into(),
            "text".into(),
            "--log-level".into(),
            "warn".into(),
        ];
        args.extend(self.extra);

        let child = Command::new(&binary)
            .args(&args)
            .env("LEPORID_SESSION_SECRET", &self.secret)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(GatewayProcess { child, port })
    }
}

impl GatewayProcess {
    pub fn build(upstream_url: &str) -> GatewayBuilder {
        GatewayBuilder { upstream_url: upstream_url.to_owned(), secret: SECRET.to_owned(), extra: Vec::new() }
    }

    /// Spawn with default arguments against `upstream_url`.
    pub fn start(upstream_url: &str) -> anyhow::Result<Self> {
        ensure_crypto();
        Self::build(upstream_url).spawn()
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Poll `/health` until it answers.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = reqwest::Client::new();
        let url = format!("{}/health", self.base_url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("gateway did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Wait for the process to exit within `timeout`.
    pub async fn wait_exit(
        &mut self,
        timeout: Duration,
    ) -> anyhow::Result<std::process::ExitStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("gateway did not exit within {timeout:?}");
            }
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for GatewayProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
