// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle: login, token refresh, and caller resolution.

pub mod login;
pub mod refresh;
pub mod resolve;

pub use login::{login, LoginRequest};
pub use refresh::Refresher;
pub use resolve::CallerIdentity;
