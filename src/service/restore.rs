//! Recreate a saved workspace in a new window.
//!
//! Window creation is asynchronous on the platform side: tabs keep appearing
//! after `create_window` returns. [`wait_for_tabs`] polls for a bounded time,
//! and group replay then works against whatever tabs exist.

use crate::platform::{GroupUpdate, Platform, PlatformError, TabInfo};
use crate::workspace::{GroupRange, TabId, WindowId};
use std::time::Duration;

/// Poll `window_id` until it reports at least `expected` tabs.
///
/// Makes at most `retries` queries, sleeping `interval` between them, and
/// returns the last tab list seen (possibly partial, possibly empty).
pub async fn wait_for_tabs<P: Platform>(
    platform: &P,
    window_id: WindowId,
    expected: usize,
    retries: u32,
    interval: Duration,
) -> Vec<TabInfo> {
    let mut tabs = Vec::new();
    for attempt in 1..=retries.max(1) {
        match platform.window_tabs(window_id).await {
            Ok(current) => {
                tabs = current;
                if tabs.len() >= expected {
                    return tabs;
                }
            }
            Err(e) => log::debug!("Tab query for new window {} failed: {}", window_id, e),
        }
        if attempt < retries {
            tokio::time::sleep(interval).await;
        }
    }
    log::warn!(
        "Window {} materialized {}/{} tabs; continuing with a partial set",
        window_id,
        tabs.len(),
        expected
    );
    tabs
}

/// Tab ids covered by an inclusive range, clipped to the tabs present.
fn range_tab_ids(tabs: &[TabInfo], range: &GroupRange) -> Vec<TabId> {
    if range.start > range.end {
        return Vec::new();
    }
    tabs.iter()
        .skip(range.start)
        .take(range.end - range.start + 1)
        .map(|tab| tab.id)
        .collect()
}

/// Rebuild stored group ranges in `window_id`. Best-effort: failures are
/// logged and skipped.
///
/// Returns the number of groups restored.
pub async fn replay_groups<P: Platform>(
    platform: &P,
    window_id: WindowId,
    tabs: &[TabInfo],
    ranges: &[GroupRange],
) -> usize {
    let mut restored = 0;
    for range in ranges {
        let tab_ids = range_tab_ids(tabs, range);
        if tab_ids.is_empty() {
            log::debug!(
                "Group range {}..={} has no tabs in window {}",
                range.start,
                range.end,
                window_id
            );
            continue;
        }

        let group_id = match platform.group_tabs(window_id, &tab_ids).await {
            Ok(group_id) => group_id,
            Err(PlatformError::Unsupported) => {
                log::debug!("Tab groups unsupported, skipping group replay");
                return restored;
            }
            Err(e) => {
                log::warn!("Failed to recreate tab group in window {}: {}", window_id, e);
                continue;
            }
        };

        let update = GroupUpdate {
            title: range.title.clone(),
            color: range.color,
            collapsed: range.collapsed,
        };
        if let Err(e) = platform.update_group(group_id, &update).await {
            log::warn!("Failed to restore tab group {} properties: {}", group_id, e);
        }
        restored += 1;
    }
    restored
}
