// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `{code, node, message, data}` response envelope shared by the gateway,
//! the upstream API, and the client mirror.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Envelope code that denotes success.
pub const SUCCESS_CODE: i64 = 200;

/// Wire shape of every gateway-produced body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self { code: SUCCESS_CODE, node: Some("success".to_owned()), message: None, data: Some(data) }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Envelope<()> {
    pub fn failure(code: u16, node: &str, message: impl Into<String>) -> Self {
        Self {
            code: i64::from(code),
            node: Some(node.to_owned()),
            message: Some(message.into()),
            data: None,
        }
    }

    /// A success envelope with `data: null`.
    pub fn empty() -> Self {
        Self { code: SUCCESS_CODE, node: Some("success".to_owned()), message: None, data: None }
    }
}

/// Structured failure decoded from a non-success envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub code: i64,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Failure {
    pub fn is_authentication(&self) -> bool {
        self.code == 401
    }

    /// Best human-readable text: message, else node, else the code.
    pub fn describe(&self) -> String {
        match (&self.message, &self.node) {
            (Some(m), _) if !m.is_empty() => m.clone(),
            (_, Some(n)) => n.clone(),
            _ => format!("request failed ({})", self.code),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.describe(), self.code)
    }
}

impl std::error::Error for Failure {}

/// A response envelope decoded into either its payload or its failure.
///
/// Decoding never guesses from field presence: `code == 200` is success and
/// the payload is read from `data`, anything else is a [`Failure`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Success(T),
    Failure(Failure),
}

#[derive(Deserialize)]
struct RawEnvelope {
    code: i64,
    #[serde(default)]
    node: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

impl<T: DeserializeOwned> Reply<T> {
    /// Decode a response body. `http_status` is only used when the body is
    /// not an envelope at all.
    pub fn decode(http_status: u16, body: &[u8]) -> Self {
        let raw: RawEnvelope = match serde_json::from_slice(body) {
            Ok(raw) => raw,
            Err(_) => {
                return Self::Failure(Failure {
                    code: i64::from(http_status),
                    node: Some("malformed-envelope".to_owned()),
                    message: Some(format!("unexpected response (HTTP {http_status})")),
                })
            }
        };

        if raw.code != SUCCESS_CODE {
            return Self::Failure(Failure { code: raw.code, node: raw.node, message: raw.message });
        }

        match serde_json::from_value(raw.data) {
            Ok(data) => Self::Success(data),
            Err(e) => Self::Failure(Failure {
                code: raw.code,
                node: Some("malformed-data".to_owned()),
                message: Some(format!("unexpected payload: {e}")),
            }),
        }
    }

    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure(failure) => Err(failure),
        }
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
