// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::{NotificationCenter, NotificationKind, NotificationSink, DEFAULT_DURATION};

#[test]
fn default_duration_is_three_seconds() {
    assert_eq!(DEFAULT_DURATION, Duration::from_millis(3000));
    let center = NotificationCenter::default();
    center.info("hello");
    assert_eq!(center.snapshot()[0].duration, DEFAULT_DURATION);
}

#[test]
fn ids_are_unique_and_snapshot_is_ordered() {
    let center = NotificationCenter::default();
    let a = center.success("saved");
    let b = center.error("failed");
    let c = center.notify(NotificationKind::Warning, "careful");
    assert!(a < b && b < c);

    let kinds: Vec<_> = center.snapshot().iter().map(|n| n.kind).collect();
    assert_eq!(kinds, [NotificationKind::Success, NotificationKind::Error, NotificationKind::Warning]);
}

#[test]
fn remove_and_clear_all() {
    let center = NotificationCenter::default();
    let a = center.info("one");
    center.info("two");

    assert!(center.remove(a));
    assert!(!center.remove(a));
    assert_eq!(center.snapshot().len(), 1);

    center.clear_all();
    assert!(center.snapshot().is_empty());
}

#[test]
fn clones_share_the_list() {
    let center = NotificationCenter::default();
    let other = center.clone();
    other.warning("shared");
    assert_eq!(center.snapshot().len(), 1);
}

#[tokio::test]
async fn notifications_dismiss_themselves() -> anyhow::Result<()> {
    let center = NotificationCenter::new(Duration::from_millis(50));
    center.error("transient");
    let sticky = center.push(NotificationKind::Info, "sticky", Duration::ZERO);
    assert_eq!(center.snapshot().len(), 2);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let left = center.snapshot();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].id, sticky);
    Ok(())
}
