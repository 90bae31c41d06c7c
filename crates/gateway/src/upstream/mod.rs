// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod client;
pub mod token;

pub use client::{Forwarded, MeAuth, UpstreamClient};
pub use token::{Grant, TokenError, TokenResponse};
