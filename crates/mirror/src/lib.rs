// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side mirror of the gateway session: an envelope-aware HTTP
//! client, a notification sink, the auth flag and a route guard.

pub mod client;
pub mod guard;
pub mod mirror;
pub mod notify;

pub use client::{ClientError, SessionClient};
pub use guard::{Navigation, RouteGuard};
pub use mirror::{AuthMirror, AuthSnapshot};
pub use notify::{Notification, NotificationCenter, NotificationKind, NotificationSink};
