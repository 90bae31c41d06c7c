// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::profile::ImageDefaults;

/// Minimum accepted length of the session secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Session-bound authenticating gateway in front of the Leporid API.
#[derive(Debug, Clone, Parser)]
#[command(name = "leporid-gateway", version, about)]
pub struct GatewayConfig {
    /// Host address to bind to.
    #[arg(long, default_value = "127.0.0.1", env = "LEPORID_GATEWAY_HOST")]
    pub host: String,

    /// HTTP port to listen on.
    #[arg(long, default_value_t = 3000, env = "LEPORID_GATEWAY_PORT")]
    pub port: u16,

    /// Base URL of the upstream Leporid identity/resource API.
    #[arg(long, default_value = "http://localhost:8080", env = "LEPORID_API")]
    pub upstream_url: String,

    /// Base URL of the game-data API relayed without credentials under
    /// `{mount}/otoge`. The relay answers 404 when unset.
    #[arg(long, env = "LEPORID_OTOGE_API")]
    pub otoge_url: Option<String>,

    /// Path prefix under which requests are handled and proxied.
    #[arg(long, default_value = "/api", env = "LEPORID_GATEWAY_MOUNT")]
    pub mount: String,

    /// Secret used to derive the cookie key and the at-rest sealing key.
    #[arg(long, env = "LEPORID_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: String,

    /// Name of the private cookie that carries the session handle.
    #[arg(long, default_value = "gateway_session", env = "LEPORID_SESSION_COOKIE")]
    pub session_cookie: String,

    /// Name of the raw upstream session cookie accepted by the identity fallback.
    #[arg(long, default_value = "leporid", env = "LEPORID_UPSTREAM_COOKIE")]
    pub upstream_cookie: String,

    /// Mark cookies `Secure` (serve over HTTPS).
    #[arg(long, env = "LEPORID_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Session lifetime in seconds (cookie max-age and sweeper cutoff).
    #[arg(long, default_value_t = 604_800, env = "LEPORID_SESSION_MAX_AGE_SECS")]
    pub session_max_age_secs: u64,

    /// Timeout for each upstream call in milliseconds.
    #[arg(long, default_value_t = 10_000, env = "LEPORID_UPSTREAM_TIMEOUT_MS")]
    pub upstream_timeout_ms: u64,

    /// Largest request body forwarded upstream, in bytes.
    #[arg(long, default_value_t = 10 * 1024 * 1024, env = "LEPORID_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    /// Interval between stale-session sweeps in milliseconds.
    #[arg(long, default_value_t = 60_000, env = "LEPORID_SWEEP_INTERVAL_MS")]
    pub sweep_interval_ms: u64,

    /// Persist sessions to this JSON file (credentials stay sealed).
    #[arg(long, env = "LEPORID_SESSION_STORE")]
    pub session_store: Option<PathBuf>,

    /// Persist profiles to this JSON file.
    #[arg(long, env = "LEPORID_PROFILE_STORE")]
    pub profile_store: Option<PathBuf>,

    /// Default character image for new preferences.
    #[arg(long, default_value = "default", env = "LEPORID_DEFAULT_CHARACTER_ID")]
    pub default_character_id: String,

    /// Default mask image for new preferences.
    #[arg(long, default_value = "default", env = "LEPORID_DEFAULT_MASK_ID")]
    pub default_mask_id: String,

    /// Default background image for new preferences.
    #[arg(long, default_value = "default", env = "LEPORID_DEFAULT_BACKGROUND_ID")]
    pub default_background_id: String,

    /// Default frame image for new preferences.
    #[arg(long, default_value = "default", env = "LEPORID_DEFAULT_FRAME_ID")]
    pub default_frame_id: String,

    /// Default passname image for new preferences.
    #[arg(long, default_value = "default", env = "LEPORID_DEFAULT_PASSNAME_ID")]
    pub default_passname_id: String,

    /// Log format (json or text).
    #[arg(long, default_value = "json", env = "LEPORID_LOG_FORMAT")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "LEPORID_LOG_LEVEL")]
    pub log_level: String,
}

impl GatewayConfig {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.session_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("--session-secret must be at least {MIN_SECRET_LEN} bytes");
        }
        if !self.mount.starts_with('/') || self.mount.ends_with('/') {
            anyhow::bail!("--mount must start with '/' and must not end with '/': {}", self.mount);
        }
        check_http_url("--upstream-url", &self.upstream_url)?;
        if let Some(ref otoge) = self.otoge_url {
            check_http_url("--otoge-url", otoge)?;
        }
        if self.sweep_interval_ms == 0 {
            anyhow::bail!("--sweep-interval-ms must be greater than zero");
        }
        if self.session_cookie.is_empty() || self.upstream_cookie.is_empty() {
            anyhow::bail!("cookie names must not be empty");
        }
        Ok(())
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_secs)
    }

    /// Image ids seeded into a freshly created preference.
    pub fn image_defaults(&self) -> ImageDefaults {
        ImageDefaults {
            character_id: self.default_character_id.clone(),
            mask_id: self.default_mask_id.clone(),
            background_id: self.default_background_id.clone(),
            frame_id: self.default_frame_id.clone(),
            passname_id: self.default_passname_id.clone(),
        }
    }

    /// Build a minimal `GatewayConfig` for tests (port 0, throwaway secret).
    #[doc(hidden)]
    pub fn test() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            upstream_url: "http://127.0.0.1:9".into(),
            otoge_url: None,
            mount: "/api".into(),
            session_secret: "test-secret-test-secret-test-secret!".into(),
            session_cookie: "gateway_session".into(),
            upstream_cookie: "leporid".into(),
            secure_cookies: false,
            session_max_age_secs: 3600,
            upstream_timeout_ms: 2_000,
            max_body_bytes: 1024 * 1024,
            sweep_interval_ms: 60_000,
            session_store: None,
            profile_store: None,
            default_character_id: "chara-0".into(),
            default_mask_id: "mask-0".into(),
            default_background_id: "bg-0".into(),
            default_frame_id: "frame-0".into(),
            default_passname_id: "pass-0".into(),
            log_format: "text".into(),
            log_level: "debug".into(),
        }
    }
}

fn check_http_url(flag: &str, value: &str) -> anyhow::Result<()> {
    let url = reqwest::Url::parse(value).map_err(|e| anyhow::anyhow!("invalid {flag} {value}: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("{flag} must be http or https: {value}");
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
