//! In-process browser model.
//!
//! [`MemoryPlatform`] keeps windows, tabs and tab groups in memory and
//! publishes a [`PlatformEvent`] for every change, the same way a browser
//! would. It backs the integration tests and the offline CLI, where no live
//! windows exist.

use super::{GroupUpdate, Platform, PlatformError, TabGroupInfo, TabInfo, WindowInfo};
use crate::events::PlatformEvent;
use crate::workspace::{GroupColor, GroupId, TabId, WindowId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// URL of the tab a window opens with when no URLs are given.
pub const NEW_TAB_URL: &str = "about:newtab";

#[derive(Debug, Default)]
struct MemoryWindow {
    tabs: Vec<TabInfo>,
    /// Until this instant `window_tabs` only sees the first tab
    materialized_at: Option<Instant>,
    title_prefix: Option<String>,
}

#[derive(Debug, Default)]
struct BrowserState {
    windows: BTreeMap<WindowId, MemoryWindow>,
    groups: HashMap<GroupId, (WindowId, TabGroupInfo)>,
    focused: Option<WindowId>,
    next_window_id: WindowId,
    next_tab_id: TabId,
    next_group_id: GroupId,
}

impl BrowserState {
    fn window_mut(&mut self, window_id: WindowId) -> Result<&mut MemoryWindow, PlatformError> {
        self.windows
            .get_mut(&window_id)
            .ok_or(PlatformError::WindowNotFound(window_id))
    }

    fn find_tab(&self, tab_id: TabId) -> Option<(WindowId, usize)> {
        self.windows.iter().find_map(|(window_id, window)| {
            window
                .tabs
                .iter()
                .position(|tab| tab.id == tab_id)
                .map(|index| (*window_id, index))
        })
    }

    fn new_tab(&mut self, url: &str) -> TabInfo {
        self.next_tab_id += 1;
        TabInfo {
            id: self.next_tab_id,
            url: url.to_string(),
            title: url.to_string(),
            active: false,
            group_id: None,
        }
    }

    fn open_window(
        &mut self,
        urls: &[String],
        materialized_at: Option<Instant>,
    ) -> (WindowId, usize) {
        self.next_window_id += 1;
        let window_id = self.next_window_id;

        let mut tabs: Vec<TabInfo> = if urls.is_empty() {
            vec![self.new_tab(NEW_TAB_URL)]
        } else {
            urls.iter().map(|url| self.new_tab(url)).collect()
        };
        if let Some(first) = tabs.first_mut() {
            first.active = true;
        }
        let count = tabs.len();

        self.windows.insert(
            window_id,
            MemoryWindow {
                tabs,
                materialized_at,
                title_prefix: None,
            },
        );
        self.focused = Some(window_id);
        (window_id, count)
    }

    /// Drop groups that no longer have tabs. Returns the windows affected.
    fn prune_groups(&mut self) -> Vec<WindowId> {
        let used: Vec<GroupId> = self
            .windows
            .values()
            .flat_map(|window| window.tabs.iter().filter_map(|tab| tab.group_id))
            .collect();
        let mut removed = Vec::new();
        self.groups.retain(|group_id, (window_id, _)| {
            let keep = used.contains(group_id);
            if !keep {
                removed.push(*window_id);
            }
            keep
        });
        removed
    }
}

/// A browser modeled in memory.
pub struct MemoryPlatform {
    state: Mutex<BrowserState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<PlatformEvent>>>,
    supports_groups: bool,
    materialize_lag: Duration,
}

impl std::fmt::Debug for MemoryPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPlatform")
            .field("supports_groups", &self.supports_groups)
            .field("materialize_lag", &self.materialize_lag)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlatform {
    /// A browser with tab-group support and instantly materialized tabs.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BrowserState::default()),
            subscribers: Mutex::new(Vec::new()),
            supports_groups: true,
            materialize_lag: Duration::ZERO,
        }
    }

    /// A browser without tab groups (e.g. Firefox).
    pub fn without_groups() -> Self {
        Self {
            supports_groups: false,
            ..Self::new()
        }
    }

    /// Windows created through [`Platform::create_window`] show only their
    /// first tab for `lag`; the other tabs (and their `TabCreated` events)
    /// appear once it has passed.
    pub fn with_materialize_lag(mut self, lag: Duration) -> Self {
        self.materialize_lag = lag;
        self
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PlatformEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    fn publish(&self, events: Vec<PlatformEvent>) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| events.iter().all(|event| tx.send(event.clone()).is_ok()));
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    /// Open a window the way a user would.
    pub fn open_window(&self, urls: &[&str]) -> WindowId {
        let urls: Vec<String> = urls.iter().map(|url| url.to_string()).collect();
        let (window_id, count) = self.state.lock().open_window(&urls, None);
        self.publish(window_opened_events(window_id, count));
        window_id
    }

    /// Close a window and all its tabs.
    pub fn close_window(&self, window_id: WindowId) -> Result<(), PlatformError> {
        let removed = {
            let mut state = self.state.lock();
            let window = state
                .windows
                .remove(&window_id)
                .ok_or(PlatformError::WindowNotFound(window_id))?;
            if state.focused == Some(window_id) {
                state.focused = None;
            }
            state.prune_groups();
            window.tabs.len()
        };

        let mut events: Vec<PlatformEvent> = (0..removed)
            .map(|_| PlatformEvent::TabRemoved {
                window_id,
                window_closing: true,
            })
            .collect();
        events.push(PlatformEvent::WindowRemoved { window_id });
        self.publish(events);
        Ok(())
    }

    /// Open a tab at the end of a window.
    pub fn open_tab(&self, window_id: WindowId, url: &str) -> Result<TabId, PlatformError> {
        let tab_id = {
            let mut state = self.state.lock();
            state.window_mut(window_id)?;
            let tab = state.new_tab(url);
            let tab_id = tab.id;
            state.window_mut(window_id)?.tabs.push(tab);
            tab_id
        };
        self.publish(vec![PlatformEvent::TabCreated { window_id }]);
        Ok(tab_id)
    }

    /// Close one tab.
    pub fn close_tab(&self, tab_id: TabId) -> Result<(), PlatformError> {
        let (window_id, groups_removed) = {
            let mut state = self.state.lock();
            let (window_id, index) = state
                .find_tab(tab_id)
                .ok_or(PlatformError::TabNotFound(tab_id))?;
            state.window_mut(window_id)?.tabs.remove(index);
            (window_id, state.prune_groups())
        };

        let mut events = vec![PlatformEvent::TabRemoved {
            window_id,
            window_closing: false,
        }];
        events.extend(
            groups_removed
                .into_iter()
                .map(|window_id| PlatformEvent::TabGroupRemoved { window_id }),
        );
        self.publish(events);
        Ok(())
    }

    /// Navigate a tab; the page title follows the URL.
    pub fn navigate(&self, tab_id: TabId, url: &str, title: &str) -> Result<(), PlatformError> {
        let window_id = {
            let mut state = self.state.lock();
            let (window_id, index) = state
                .find_tab(tab_id)
                .ok_or(PlatformError::TabNotFound(tab_id))?;
            let tab = &mut state.window_mut(window_id)?.tabs[index];
            tab.url = url.to_string();
            tab.title = title.to_string();
            window_id
        };
        self.publish(vec![PlatformEvent::TabUpdated {
            window_id,
            title_changed: true,
        }]);
        Ok(())
    }

    /// Make a tab the active one in its window.
    pub fn activate_tab(&self, tab_id: TabId) -> Result<(), PlatformError> {
        let window_id = {
            let mut state = self.state.lock();
            let (window_id, index) = state
                .find_tab(tab_id)
                .ok_or(PlatformError::TabNotFound(tab_id))?;
            for (i, tab) in state.window_mut(window_id)?.tabs.iter_mut().enumerate() {
                tab.active = i == index;
            }
            window_id
        };
        self.publish(vec![PlatformEvent::TabActivated { window_id }]);
        Ok(())
    }

    /// Move a tab to `new_index` within its window.
    pub fn move_tab(&self, tab_id: TabId, new_index: usize) -> Result<(), PlatformError> {
        let window_id = {
            let mut state = self.state.lock();
            let (window_id, index) = state
                .find_tab(tab_id)
                .ok_or(PlatformError::TabNotFound(tab_id))?;
            let tabs = &mut state.window_mut(window_id)?.tabs;
            let tab = tabs.remove(index);
            let new_index = new_index.min(tabs.len());
            tabs.insert(new_index, tab);
            window_id
        };
        self.publish(vec![PlatformEvent::TabMoved { window_id }]);
        Ok(())
    }

    /// Give focus to a window, or to no window with
    /// [`WINDOW_ID_NONE`](crate::workspace::WINDOW_ID_NONE).
    pub fn user_focus(&self, window_id: WindowId) {
        {
            let mut state = self.state.lock();
            state.focused = state.windows.contains_key(&window_id).then_some(window_id);
        }
        self.publish(vec![PlatformEvent::WindowFocusChanged { window_id }]);
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.state.lock().windows.keys().copied().collect()
    }

    pub fn has_window(&self, window_id: WindowId) -> bool {
        self.state.lock().windows.contains_key(&window_id)
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.state.lock().focused
    }

    /// Every tab of a window, ignoring materialization lag.
    pub fn tabs_of(&self, window_id: WindowId) -> Vec<TabInfo> {
        self.state
            .lock()
            .windows
            .get(&window_id)
            .map(|window| window.tabs.clone())
            .unwrap_or_default()
    }

    /// Tab groups of a window in id order.
    pub fn groups_of(&self, window_id: WindowId) -> Vec<TabGroupInfo> {
        let state = self.state.lock();
        let mut groups: Vec<TabGroupInfo> = state
            .groups
            .values()
            .filter(|(owner, _)| *owner == window_id)
            .map(|(_, group)| group.clone())
            .collect();
        groups.sort_by_key(|group| group.id);
        groups
    }

    pub fn title_prefix_of(&self, window_id: WindowId) -> Option<String> {
        self.state
            .lock()
            .windows
            .get(&window_id)
            .and_then(|window| window.title_prefix.clone())
    }
}

fn window_opened_events(window_id: WindowId, tab_count: usize) -> Vec<PlatformEvent> {
    let mut events = vec![PlatformEvent::WindowCreated { window_id }];
    events.extend((0..tab_count).map(|_| PlatformEvent::TabCreated { window_id }));
    events.push(PlatformEvent::WindowFocusChanged { window_id });
    events
}

impl Platform for MemoryPlatform {
    async fn window_tabs(&self, window_id: WindowId) -> Result<Vec<TabInfo>, PlatformError> {
        let mut state = self.state.lock();
        let window = state.window_mut(window_id)?;
        if window
            .materialized_at
            .is_some_and(|at| Instant::now() < at)
        {
            return Ok(window.tabs.iter().take(1).cloned().collect());
        }
        Ok(window.tabs.clone())
    }

    async fn window_groups(
        &self,
        window_id: WindowId,
    ) -> Result<Option<Vec<TabGroupInfo>>, PlatformError> {
        if !self.supports_groups {
            return Ok(None);
        }
        if !self.has_window(window_id) {
            return Err(PlatformError::WindowNotFound(window_id));
        }
        Ok(Some(self.groups_of(window_id)))
    }

    async fn list_windows(&self) -> Result<Vec<WindowInfo>, PlatformError> {
        let state = self.state.lock();
        Ok(state
            .windows
            .iter()
            .map(|(id, window)| WindowInfo {
                id: *id,
                focused: state.focused == Some(*id),
                tabs: window.tabs.clone(),
            })
            .collect())
    }

    async fn create_window(&self, urls: &[String]) -> Result<WindowId, PlatformError> {
        if self.materialize_lag.is_zero() {
            let (window_id, count) = self.state.lock().open_window(urls, None);
            log::debug!("Created window {} with {} tabs", window_id, count);
            self.publish(window_opened_events(window_id, count));
            return Ok(window_id);
        }

        let at = Instant::now() + self.materialize_lag;
        let (window_id, count) = self.state.lock().open_window(urls, Some(at));
        log::debug!(
            "Created window {} with {} tabs, materializing after {:?}",
            window_id,
            count,
            self.materialize_lag
        );
        self.publish(window_opened_events(window_id, count.min(1)));

        if count > 1 {
            let subscribers = self.subscribers.lock().clone();
            tokio::spawn(async move {
                tokio::time::sleep_until(at).await;
                for tx in &subscribers {
                    for _ in 1..count {
                        let _ = tx.send(PlatformEvent::TabCreated { window_id });
                    }
                }
            });
        }
        Ok(window_id)
    }

    async fn focus_window(&self, window_id: WindowId) -> Result<(), PlatformError> {
        {
            let mut state = self.state.lock();
            if !state.windows.contains_key(&window_id) {
                return Err(PlatformError::WindowNotFound(window_id));
            }
            state.focused = Some(window_id);
        }
        self.publish(vec![PlatformEvent::WindowFocusChanged { window_id }]);
        Ok(())
    }

    async fn group_tabs(
        &self,
        window_id: WindowId,
        tab_ids: &[TabId],
    ) -> Result<GroupId, PlatformError> {
        if !self.supports_groups {
            return Err(PlatformError::Unsupported);
        }
        if tab_ids.is_empty() {
            return Err(PlatformError::Call("No tabs to group".to_string()));
        }

        let group_id = {
            let mut state = self.state.lock();
            state.next_group_id += 1;
            let group_id = state.next_group_id;

            let window = state.window_mut(window_id)?;
            for tab_id in tab_ids {
                if !window.tabs.iter().any(|tab| tab.id == *tab_id) {
                    return Err(PlatformError::TabNotFound(*tab_id));
                }
            }
            for tab in window.tabs.iter_mut() {
                if tab_ids.contains(&tab.id) {
                    tab.group_id = Some(group_id);
                }
            }
            state.groups.insert(
                group_id,
                (
                    window_id,
                    TabGroupInfo {
                        id: group_id,
                        title: String::new(),
                        color: GroupColor::default(),
                        collapsed: false,
                    },
                ),
            );
            state.prune_groups();
            group_id
        };

        self.publish(vec![PlatformEvent::TabGroupCreated { window_id }]);
        Ok(group_id)
    }

    async fn update_group(
        &self,
        group_id: GroupId,
        update: &GroupUpdate,
    ) -> Result<(), PlatformError> {
        let window_id = {
            let mut state = self.state.lock();
            let (window_id, group) = state
                .groups
                .get_mut(&group_id)
                .ok_or(PlatformError::GroupNotFound(group_id))?;
            group.title = update.title.clone();
            group.color = update.color;
            group.collapsed = update.collapsed;
            *window_id
        };
        self.publish(vec![PlatformEvent::TabGroupUpdated { window_id }]);
        Ok(())
    }

    async fn set_window_title_prefix(
        &self,
        window_id: WindowId,
        prefix: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.window_mut(window_id)?.title_prefix = Some(prefix.to_string());
        Ok(())
    }
}
