// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream token endpoint types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::session::CredentialPair;

/// Body returned by `POST /auth/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Lifetime in seconds, counted from receipt.
    pub expires_in: u64,
}

impl TokenResponse {
    pub fn into_pair(self, received_at_ms: u64) -> CredentialPair {
        CredentialPair::issued(self.access_token, self.refresh_token, received_at_ms, self.expires_in)
    }
}

/// Grant presented to the token endpoint.
#[derive(Clone)]
pub enum Grant {
    Password { username: String, password: String },
    RefreshToken { refresh_token: String },
}

impl Grant {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }

    /// Query parameters for the token request.
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![("grant_type", self.kind())];
        match self {
            Self::Password { username, password } => {
                params.push(("username", username));
                params.push(("password", password));
            }
            Self::RefreshToken { refresh_token } => {
                params.push(("refresh_token", refresh_token));
            }
        }
        params
    }
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { username, .. } => {
                f.debug_struct("Password").field("username", username).finish_non_exhaustive()
            }
            Self::RefreshToken { .. } => f.debug_struct("RefreshToken").finish_non_exhaustive(),
        }
    }
}

/// Why a token exchange did not produce a pair.
#[derive(Debug)]
pub enum TokenError {
    /// Upstream answered with a non-success status.
    Rejected { status: u16, detail: String },
    /// Connect, timeout or body read failure.
    Transport(reqwest::Error),
    /// Upstream answered 2xx with a body that is not a token response.
    Malformed(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { status, detail } => write!(f, "token grant rejected ({status}): {detail}"),
            Self::Transport(e) => write!(f, "token endpoint unreachable: {e}"),
            Self::Malformed(e) => write!(f, "malformed token response: {e}"),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<reqwest::Error> for TokenError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e)
    }
}
