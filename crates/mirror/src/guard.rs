// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Navigation guard for protected routes.

use std::sync::Arc;

use crate::mirror::AuthMirror;
use crate::notify::NotificationKind;

pub const SIGN_IN_REQUIRED: &str = "Please sign in to continue";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(String),
}

pub struct RouteGuard {
    mirror: Arc<AuthMirror>,
    protected: Vec<String>,
    login_route: String,
}

impl RouteGuard {
    pub fn new(mirror: Arc<AuthMirror>, login_route: &str) -> Self {
        Self { mirror, protected: Vec::new(), login_route: login_route.to_owned() }
    }

    /// Require a session for `prefix` and everything below it.
    pub fn protect(mut self, prefix: &str) -> Self {
        self.protected.push(prefix.trim_end_matches('/').to_owned());
        self
    }

    pub fn is_protected(&self, route: &str) -> bool {
        let path = route.split(['?', '#']).next().unwrap_or(route);
        self.protected.iter().any(|prefix| covers(prefix, path))
    }

    /// Re-synchronize lazily, then decide whether `route` may be shown.
    pub async fn navigate(&self, route: &str) -> Navigation {
        let logged_in = self.mirror.lazy_fetch().await;
        if logged_in || !self.is_protected(route) {
            return Navigation::Proceed;
        }
        tracing::debug!(route, "redirecting unauthenticated navigation");
        self.mirror.client().notifier().notify(NotificationKind::Warning, SIGN_IN_REQUIRED);
        Navigation::Redirect(self.login_route.clone())
    }
}

/// Whether `prefix` covers `path` on a segment boundary.
fn covers(prefix: &str, path: &str) -> bool {
    prefix.is_empty()
        || path == prefix
        || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
