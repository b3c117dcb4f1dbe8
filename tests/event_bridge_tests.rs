//! Integration tests for the event bridge and debounced reconciliation.
//!
//! These run on tokio's paused clock so debounce timing is deterministic.

mod common;

use common::{Harness, QUIET_MS, advance, record, seeded_store, test_settings};
use std::sync::Arc;
use std::time::Duration;
use tabshelf::events::PlatformEvent;
use tabshelf::platform::Platform;
use tabshelf::platform::memory::MemoryPlatform;
use tabshelf::scheduler::DebounceSettings;
use tabshelf::workspace::{GroupColor, GroupRange, WINDOW_ID_NONE, WindowId};
use tabshelf::{MemoryStore, ServiceSettings};
use tokio::sync::mpsc;

/// Open and save a window, leaving no unhandled events behind.
async fn saved_window(h: &mut Harness, urls: &[&str]) -> WindowId {
    let window = h.platform.open_window(urls);
    h.service.save_window(window).await.unwrap();
    h.discard_events();
    window
}

fn first_tab(h: &Harness, window: WindowId) -> i64 {
    h.platform.tabs_of(window)[0].id
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_events_coalesces_into_one_write() {
    let mut h = Harness::new();
    let window = saved_window(&mut h, &["https://a"]).await;
    let tab = first_tab(&h, window);
    let writes = h.writes();

    for n in 1..=5 {
        h.platform
            .navigate(tab, &format!("https://a/{n}"), &format!("Page {n}"))
            .unwrap();
    }
    assert_eq!(h.pump().await, 5);
    assert_eq!(h.service.pending_reconcile(), vec![window]);

    advance(QUIET_MS - 1).await;
    assert_eq!(h.writes(), writes);

    advance(2).await;
    assert_eq!(h.writes(), writes + 1);
    assert!(!h.service.reconcile_armed());

    let record = h.workspace(1).await.unwrap();
    assert_eq!(record.tabs, vec!["https://a/5"]);
    assert_eq!(record.title, "Page 5");
}

#[tokio::test(start_paused = true)]
async fn test_each_event_restarts_the_quiet_period() {
    let mut h = Harness::new();
    let window = saved_window(&mut h, &["https://a"]).await;
    let writes = h.writes();

    h.platform.open_tab(window, "https://b").unwrap();
    h.pump().await;
    advance(500).await;
    h.platform.open_tab(window, "https://c").unwrap();
    h.pump().await;
    advance(500).await;
    assert_eq!(h.writes(), writes);

    advance(QUIET_MS - 500 + 1).await;
    assert_eq!(h.writes(), writes + 1);
    assert_eq!(
        h.workspace(1).await.unwrap().tabs,
        vec!["https://a", "https://b", "https://c"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_max_delay_bounds_a_continuous_stream() {
    let settings = ServiceSettings {
        debounce: DebounceSettings {
            quiet: Duration::from_millis(QUIET_MS),
            max_delay: Some(Duration::from_millis(2_000)),
        },
        ..test_settings()
    };
    let mut h = Harness::with_settings(MemoryPlatform::new(), MemoryStore::new(), settings);
    let window = saved_window(&mut h, &["https://a"]).await;
    let tab = first_tab(&h, window);
    let writes = h.writes();

    for n in 0..6 {
        h.platform
            .navigate(tab, &format!("https://a/{n}"), "A")
            .unwrap();
        h.pump().await;
        advance(500).await;
    }

    assert!(h.writes() > writes);
}

#[tokio::test(start_paused = true)]
async fn test_window_close_unbinds_immediately() {
    let mut h = Harness::new();
    let window = saved_window(&mut h, &["https://a", "https://b"]).await;
    let tab = first_tab(&h, window);

    h.platform.navigate(tab, "https://a/next", "Next").unwrap();
    h.pump().await;
    assert_eq!(h.service.pending_reconcile(), vec![window]);

    h.platform.close_window(window).unwrap();
    h.pump().await;

    let record = h.workspace(1).await.unwrap();
    assert_eq!(record.window_id, None);
    assert!(h.service.pending_reconcile().is_empty());
    assert!(!h.service.reconcile_armed());
    assert_eq!(h.service.last_active(window), None);

    // Nothing resurrects the binding later.
    advance(QUIET_MS * 2).await;
    let record = h.workspace(1).await.unwrap();
    assert_eq!(record.window_id, None);
    assert_eq!(record.tabs, vec!["https://a", "https://b"]);
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_skips_window_that_vanished() {
    let mut h = Harness::new();
    let window = saved_window(&mut h, &["https://a"]).await;
    let tab = first_tab(&h, window);
    h.platform.navigate(tab, "https://a/next", "Next").unwrap();
    h.pump().await;

    // Closed, but the removal event has not been delivered yet.
    h.platform.close_window(window).unwrap();
    let writes = h.writes();
    advance(QUIET_MS + 1).await;

    assert_eq!(h.writes(), writes);
    let record = h.workspace(1).await.unwrap();
    assert_eq!(record.tabs, vec!["https://a"]);
    assert_eq!(record.window_id, Some(window));

    h.pump().await;
    assert_eq!(h.workspace(1).await.unwrap().window_id, None);
}

#[tokio::test(start_paused = true)]
async fn test_unsaved_windows_cause_no_writes() {
    let mut h = Harness::new();
    saved_window(&mut h, &["https://saved"]).await;
    let loose = h.platform.open_window(&["https://loose"]);
    h.platform.open_tab(loose, "https://loose/2").unwrap();
    h.pump().await;
    let writes = h.writes();

    advance(QUIET_MS + 1).await;

    assert_eq!(h.writes(), writes);
    assert!(!h.service.reconcile_armed());
}

#[tokio::test(start_paused = true)]
async fn test_tab_updates_without_title_change_are_ignored() {
    let h = Harness::new();
    let window = h.platform.open_window(&["https://a"]);

    h.service
        .handle_event(PlatformEvent::TabUpdated {
            window_id: window,
            title_changed: false,
        })
        .await;
    assert!(h.service.pending_reconcile().is_empty());

    h.service
        .handle_event(PlatformEvent::TabUpdated {
            window_id: window,
            title_changed: true,
        })
        .await;
    assert_eq!(h.service.pending_reconcile(), vec![window]);
}

#[tokio::test(start_paused = true)]
async fn test_closing_tabs_of_closing_window_schedules_nothing() {
    let h = Harness::new();
    h.service
        .handle_event(PlatformEvent::TabRemoved {
            window_id: 7,
            window_closing: true,
        })
        .await;
    assert!(h.service.pending_reconcile().is_empty());
}

#[tokio::test]
async fn test_focus_changes_record_last_active() {
    let mut h = Harness::new();
    let first = h.platform.open_window(&["https://a"]);
    let second = h.platform.open_window(&["https://b"]);
    h.pump().await;
    let first_seen = h.service.last_active(first).unwrap();

    h.platform.user_focus(WINDOW_ID_NONE);
    h.pump().await;
    assert_eq!(h.service.last_active(WINDOW_ID_NONE), None);

    h.platform.user_focus(second);
    h.pump().await;
    assert!(h.service.last_active(second).unwrap() >= first_seen);

    h.service
        .handle_event(PlatformEvent::WindowFocusChanged { window_id: -5 })
        .await;
    assert_eq!(h.service.last_active(-5), None);
}

#[tokio::test(start_paused = true)]
async fn test_custom_title_survives_reconcile() {
    let mut h = Harness::new();
    let window = saved_window(&mut h, &["https://a"]).await;
    h.service.rename_workspace(1, "Pinned").await.unwrap();
    let tab = first_tab(&h, window);

    h.platform
        .navigate(tab, "https://elsewhere", "Elsewhere")
        .unwrap();
    h.pump().await;
    advance(QUIET_MS + 1).await;

    let record = h.workspace(1).await.unwrap();
    assert_eq!(record.tabs, vec!["https://elsewhere"]);
    assert_eq!(record.title, "Pinned");
}

#[tokio::test(start_paused = true)]
async fn test_group_changes_are_reconciled() {
    let mut h = Harness::new();
    let window = saved_window(&mut h, &["https://a", "https://b", "https://c"]).await;
    let tabs = h.platform.tabs_of(window);

    h.platform
        .group_tabs(window, &[tabs[0].id, tabs[1].id])
        .await
        .unwrap();
    h.pump().await;
    advance(QUIET_MS + 1).await;

    let ranges = h.workspace(1).await.unwrap().group_ranges;
    assert_eq!(ranges.len(), 1);
    assert_eq!((ranges[0].start, ranges[0].end), (0, 1));

    h.platform.move_tab(tabs[2].id, 0).unwrap();
    h.pump().await;
    advance(QUIET_MS + 1).await;

    let record = h.workspace(1).await.unwrap();
    assert_eq!(record.tabs, vec!["https://c", "https://a", "https://b"]);
    assert_eq!(
        (record.group_ranges[0].start, record.group_ranges[0].end),
        (1, 2)
    );
}

#[tokio::test(start_paused = true)]
async fn test_platform_without_groups_keeps_stored_ranges() {
    // The in-memory browser numbers windows from 1.
    let mut bound = record(1, Some(1), &["https://a", "https://b"], "A", 0);
    bound.group_ranges = vec![GroupRange {
        start: 0,
        end: 1,
        title: "kept".to_string(),
        color: GroupColor::Green,
        collapsed: false,
    }];
    let mut h = Harness::with_platform(MemoryPlatform::without_groups(), seeded_store(vec![bound]));
    let window = h.platform.open_window(&["https://a", "https://b"]);
    assert_eq!(window, 1);
    h.discard_events();

    let tab = first_tab(&h, window);
    h.platform.navigate(tab, "https://c", "C").unwrap();
    h.pump().await;
    advance(QUIET_MS + 1).await;

    let record = h.workspace(1).await.unwrap();
    assert_eq!(record.tabs, vec!["https://c", "https://b"]);
    assert_eq!(record.group_ranges.len(), 1);
    assert_eq!(record.group_ranges[0].title, "kept");
}

#[tokio::test]
async fn test_event_loop_flushes_pending_work_on_close() {
    let h = Harness::new();
    let window = h.platform.open_window(&["https://a"]);
    h.service.save_window(window).await.unwrap();
    let tab = h.platform.tabs_of(window)[0].id;
    h.platform.navigate(tab, "https://a/final", "Final").unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let service = Arc::clone(&h.service);
    let task = tokio::spawn(async move { service.run_event_loop(rx).await });

    tx.send(PlatformEvent::TabUpdated {
        window_id: window,
        title_changed: true,
    })
    .unwrap();
    drop(tx);
    task.await.unwrap();

    assert!(h.service.pending_reconcile().is_empty());
    let record = h.workspace(1).await.unwrap();
    assert_eq!(record.tabs, vec!["https://a/final"]);
    assert_eq!(record.title, "Final");
}
