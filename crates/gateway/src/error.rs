// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;

/// Error codes for the gateway API.
///
/// Authentication-class codes (`Unauthenticated`, `RefreshFailed`) mean the
/// caller has no usable session; everything else leaves session state alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Unauthenticated,
    RefreshFailed,
    UpstreamUnavailable,
    BadRequest,
    NotFound,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::RefreshFailed => 401,
            Self::UpstreamUnavailable => 502,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }

    /// Machine-readable node name carried in error envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::RefreshFailed => "refresh-failed",
            Self::UpstreamUnavailable => "upstream-unavailable",
            Self::BadRequest => "bad-request",
            Self::NotFound => "not-found",
            Self::Internal => "internal",
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::RefreshFailed)
    }

    pub fn with(self, message: impl Into<String>) -> GatewayError {
        GatewayError { code: self, message: message.into() }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An [`ErrorCode`] plus the user-visible message that goes into the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub code: ErrorCode,
    pub message: String,
}

impl GatewayError {
    /// Wrap an internal failure: log the detail, surface a generic message.
    pub fn internal(err: impl fmt::Display) -> Self {
        tracing::error!(err = %err, "internal gateway error");
        ErrorCode::Internal.with("internal server error")
    }

    pub fn to_envelope(&self) -> Envelope<()> {
        Envelope::failure(self.code.http_status(), self.code.as_str(), self.message.clone())
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_envelope())).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
