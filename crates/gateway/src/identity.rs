// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Upstream user id.
pub type UserId = i64;

/// Public user identity as returned by the upstream `GET /users/me`.
///
/// This is the only part of a session the browser may see. Privileges are
/// passed through as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub privileges: Vec<String>,
}
