//! Reconcile stored workspaces with a live window's tabs and groups.

use crate::platform::{TabGroupInfo, TabInfo, representative_title};
use crate::workspace::{GroupId, GroupRange, WindowId, WorkspaceRegistry};

/// Compute the contiguous tab-index ranges covered by each group.
///
/// Every maximal run of adjacent tabs sharing a group id becomes one range.
/// Tabs pointing at a group missing from `groups` count as ungrouped.
pub fn compute_group_ranges(tabs: &[TabInfo], groups: &[TabGroupInfo]) -> Vec<GroupRange> {
    let mut ranges = Vec::new();
    let mut current: Option<(GroupId, usize)> = None;

    let group_of = |tab: &TabInfo| {
        tab.group_id
            .filter(|id| groups.iter().any(|group| group.id == *id))
    };

    let mut close = |group_id: GroupId, start: usize, end: usize, ranges: &mut Vec<GroupRange>| {
        if let Some(group) = groups.iter().find(|group| group.id == group_id) {
            ranges.push(GroupRange {
                start,
                end,
                title: group.title.clone(),
                color: group.color,
                collapsed: group.collapsed,
            });
        }
    };

    for (index, tab) in tabs.iter().enumerate() {
        let group_id = group_of(tab);
        match (current, group_id) {
            (Some((open, _)), Some(id)) if open == id => {}
            (Some((open, start)), _) => {
                close(open, start, index - 1, &mut ranges);
                current = group_id.map(|id| (id, index));
            }
            (None, Some(id)) => current = Some((id, index)),
            (None, None) => {}
        }
    }
    if let Some((open, start)) = current {
        close(open, start, tabs.len() - 1, &mut ranges);
    }
    ranges
}

/// Overwrite the cached state of every workspace bound to `window_id`.
///
/// Tabs are replaced in order, group ranges are replaced when `live_groups` is
/// `Some` (platforms without tab groups pass `None` and keep what is stored),
/// and the title follows the representative tab unless a custom title is set.
/// An empty `live_tabs` leaves everything untouched.
///
/// Returns whether any record changed.
pub fn reconcile_window(
    registry: &mut WorkspaceRegistry,
    window_id: WindowId,
    live_tabs: &[TabInfo],
    live_groups: Option<&[TabGroupInfo]>,
) -> bool {
    if live_tabs.is_empty() {
        return false;
    }

    let urls: Vec<String> = live_tabs.iter().map(|tab| tab.url.clone()).collect();
    let title = representative_title(live_tabs);
    let ranges = live_groups.map(|groups| compute_group_ranges(live_tabs, groups));

    let mut changed = false;
    for id in registry.workspaces_bound_to(window_id) {
        let Some(record) = registry.get_mut(id) else {
            continue;
        };

        if record.tabs != urls {
            record.tabs = urls.clone();
            changed = true;
        }
        if let Some(ranges) = &ranges
            && record.group_ranges != *ranges
        {
            record.group_ranges = ranges.clone();
            changed = true;
        }
        match &record.custom_title {
            Some(custom) => {
                if record.title != *custom {
                    record.title = custom.clone();
                    changed = true;
                }
            }
            None => {
                if record.title != title {
                    record.title = title.clone();
                    changed = true;
                }
            }
        }

        if changed {
            log::debug!(
                "Reconciled workspace {} with window {} ({} tabs)",
                id,
                window_id,
                record.tabs.len()
            );
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::{GroupColor, StoreRoot, WorkspaceRecord};

    fn tab(id: i64, url: &str, title: &str, active: bool, group_id: Option<GroupId>) -> TabInfo {
        TabInfo {
            id,
            url: url.to_string(),
            title: title.to_string(),
            active,
            group_id,
        }
    }

    fn group(id: GroupId, title: &str, color: GroupColor, collapsed: bool) -> TabGroupInfo {
        TabGroupInfo {
            id,
            title: title.to_string(),
            color,
            collapsed,
        }
    }

    fn registry(records: Vec<WorkspaceRecord>) -> WorkspaceRegistry {
        let mut root = StoreRoot::default();
        for record in records {
            root.workspaces.insert(record.id, record);
        }
        root.next_id = root.min_next_id();
        WorkspaceRegistry::from_root(root)
    }

    fn bound(id: u64, window_id: WindowId, custom_title: Option<&str>) -> WorkspaceRecord {
        WorkspaceRecord {
            id,
            window_id: Some(window_id),
            tabs: vec!["https://old".to_string()],
            title: custom_title.unwrap_or("Old").to_string(),
            custom_title: custom_title.map(str::to_string),
            order: 0,
            group_ranges: Vec::new(),
        }
    }

    #[test]
    fn test_ranges_for_contiguous_groups() {
        let tabs = vec![
            tab(1, "https://a", "A", false, Some(10)),
            tab(2, "https://b", "B", false, Some(10)),
            tab(3, "https://c", "C", false, None),
            tab(4, "https://d", "D", false, Some(20)),
        ];
        let groups = vec![
            group(10, "docs", GroupColor::Blue, false),
            group(20, "misc", GroupColor::Red, true),
        ];

        let ranges = compute_group_ranges(&tabs, &groups);
        assert_eq!(
            ranges,
            vec![
                GroupRange {
                    start: 0,
                    end: 1,
                    title: "docs".to_string(),
                    color: GroupColor::Blue,
                    collapsed: false,
                },
                GroupRange {
                    start: 3,
                    end: 3,
                    title: "misc".to_string(),
                    color: GroupColor::Red,
                    collapsed: true,
                },
            ]
        );
    }

    #[test]
    fn test_adjacent_groups_split_ranges() {
        let tabs = vec![
            tab(1, "https://a", "A", false, Some(1)),
            tab(2, "https://b", "B", false, Some(2)),
            tab(3, "https://c", "C", false, Some(1)),
        ];
        let groups = vec![
            group(1, "one", GroupColor::Green, false),
            group(2, "two", GroupColor::Pink, false),
        ];

        let ranges = compute_group_ranges(&tabs, &groups);
        let spans: Vec<(usize, usize, &str)> = ranges
            .iter()
            .map(|r| (r.start, r.end, r.title.as_str()))
            .collect();
        assert_eq!(spans, vec![(0, 0, "one"), (1, 1, "two"), (2, 2, "one")]);
    }

    #[test]
    fn test_unknown_group_ids_are_ungrouped() {
        let tabs = vec![tab(1, "https://a", "A", false, Some(99))];
        assert!(compute_group_ranges(&tabs, &[]).is_empty());
        assert!(compute_group_ranges(&[], &[]).is_empty());
    }

    #[test]
    fn test_reconcile_overwrites_tabs_and_title() {
        let mut registry = registry(vec![bound(1, 5, None)]);
        let tabs = vec![
            tab(1, "https://a", "A", false, None),
            tab(2, "https://b", "B", true, None),
        ];

        assert!(reconcile_window(&mut registry, 5, &tabs, Some(&[])));

        let record = registry.get(1).unwrap();
        assert_eq!(record.tabs, vec!["https://a", "https://b"]);
        assert_eq!(record.title, "B");
    }

    #[test]
    fn test_empty_tabs_is_noop() {
        let mut registry = registry(vec![bound(1, 5, None)]);
        assert!(!reconcile_window(&mut registry, 5, &[], Some(&[])));
        assert_eq!(registry.get(1).unwrap().tabs, vec!["https://old"]);
    }

    #[test]
    fn test_other_windows_untouched() {
        let mut registry = registry(vec![bound(1, 5, None), bound(2, 6, None)]);
        let tabs = vec![tab(1, "https://a", "A", true, None)];

        reconcile_window(&mut registry, 5, &tabs, None);

        assert_eq!(registry.get(2).unwrap().tabs, vec!["https://old"]);
    }

    #[test]
    fn test_custom_title_is_sticky() {
        let mut registry = registry(vec![bound(1, 5, Some("Research"))]);
        let tabs = vec![tab(1, "https://a", "Some Page", true, None)];

        for _ in 0..3 {
            reconcile_window(&mut registry, 5, &tabs, None);
        }

        let record = registry.get(1).unwrap();
        assert_eq!(record.title, "Research");
        assert_eq!(record.tabs, vec!["https://a"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut registry = registry(vec![bound(1, 5, None)]);
        let tabs = vec![
            tab(1, "https://a", "A", true, Some(3)),
            tab(2, "https://b", "B", false, None),
        ];
        let groups = vec![group(3, "g", GroupColor::Yellow, false)];

        assert!(reconcile_window(&mut registry, 5, &tabs, Some(&groups)));
        let first = registry.get(1).unwrap().clone();
        assert!(!reconcile_window(&mut registry, 5, &tabs, Some(&groups)));
        assert_eq!(registry.get(1).unwrap(), &first);
        assert_eq!(first.group_ranges.len(), 1);
    }

    #[test]
    fn test_groups_kept_when_platform_has_none() {
        let mut record = bound(1, 5, None);
        record.group_ranges = vec![GroupRange {
            start: 0,
            end: 0,
            title: "kept".to_string(),
            color: GroupColor::Orange,
            collapsed: false,
        }];
        let mut registry = registry(vec![record]);

        reconcile_window(
            &mut registry,
            5,
            &[tab(1, "https://a", "A", true, None)],
            None,
        );

        assert_eq!(registry.get(1).unwrap().group_ranges[0].title, "kept");
    }

    #[test]
    fn test_all_records_for_window_updated() {
        let mut registry = registry(vec![bound(1, 5, None), bound(2, 5, Some("Pinned"))]);
        let tabs = vec![tab(1, "https://new", "New", true, None)];

        assert!(reconcile_window(&mut registry, 5, &tabs, None));

        assert_eq!(registry.get(1).unwrap().tabs, vec!["https://new"]);
        assert_eq!(registry.get(2).unwrap().tabs, vec!["https://new"]);
        assert_eq!(registry.get(1).unwrap().title, "New");
        assert_eq!(registry.get(2).unwrap().title, "Pinned");
    }
}
