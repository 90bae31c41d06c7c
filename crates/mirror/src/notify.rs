// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing notifications raised by the client on failures and
//! session transitions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

/// Dismissal delay used when none is given.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    /// Zero means the notification stays until removed.
    #[serde(skip)]
    pub duration: Duration,
}

/// Anything that can display a notification.
pub trait NotificationSink: Send + Sync {
    /// Raise a notification and return its id.
    fn notify(&self, kind: NotificationKind, message: &str) -> u64;
}

/// In-memory notification list with timed auto-dismissal.
///
/// Cheap to clone; clones share the same list.
#[derive(Clone)]
pub struct NotificationCenter {
    items: Arc<Mutex<Vec<Notification>>>,
    next_id: Arc<AtomicU64>,
    duration: Duration,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION)
    }
}

impl NotificationCenter {
    pub fn new(duration: Duration) -> Self {
        Self { items: Arc::new(Mutex::new(Vec::new())), next_id: Arc::new(AtomicU64::new(1)), duration }
    }

    /// Raise a notification with an explicit dismissal delay.
    pub fn push(&self, kind: NotificationKind, message: &str, duration: Duration) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.items.lock().push(Notification { id, kind, message: message.to_owned(), duration });

        if !duration.is_zero() {
            // Outside a runtime nothing dismisses; callers remove manually.
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                let items = Arc::clone(&self.items);
                runtime.spawn(async move {
                    tokio::time::sleep(duration).await;
                    items.lock().retain(|n| n.id != id);
                });
            }
        }
        id
    }

    pub fn success(&self, message: &str) -> u64 {
        self.notify(NotificationKind::Success, message)
    }

    pub fn error(&self, message: &str) -> u64 {
        self.notify(NotificationKind::Error, message)
    }

    pub fn warning(&self, message: &str) -> u64 {
        self.notify(NotificationKind::Warning, message)
    }

    pub fn info(&self, message: &str) -> u64 {
        self.notify(NotificationKind::Info, message)
    }

    /// Remove one notification. Returns whether it was still shown.
    pub fn remove(&self, id: u64) -> bool {
        let mut items = self.items.lock();
        let before = items.len();
        items.retain(|n| n.id != id);
        items.len() != before
    }

    pub fn clear_all(&self) {
        self.items.lock().clear();
    }

    /// Currently shown notifications, oldest first.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.items.lock().clone()
    }
}

impl NotificationSink for NotificationCenter {
    fn notify(&self, kind: NotificationKind, message: &str) -> u64 {
        self.push(kind, message, self.duration)
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
