//! User-facing workspace operations.

use super::WorkspaceService;
use super::capture::capture_window;
use super::restore::{replay_groups, wait_for_tabs};
use crate::error::WorkspaceError;
use crate::platform::{Platform, representative_title};
use crate::reconcile::compute_group_ranges;
use crate::sanitize::sanitize;
use crate::store::{KeyValueStore, NEXT_ID_KEY, WORKSPACES_KEY};
use crate::workspace::{MAX_EXACT_INTEGER, StoreRoot, WindowId, WorkspaceId, WorkspaceRecord};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Result of opening a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenReply {
    pub message: String,
    pub window_id: WindowId,
}

impl OpenReply {
    pub const FOCUSED: &'static str = "Focused existing window.";
    pub const OPENED: &'static str = "Workspace opened in a new window.";
}

/// An open window that no workspace is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsavedWindow {
    pub window_id: WindowId,
    pub title: String,
    pub tab_count: usize,
    /// Unix millis of the last focus, 0 when unknown
    pub last_active: i64,
}

/// Everything the UI lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateReply {
    pub saved: Vec<WorkspaceRecord>,
    pub unsaved: Vec<UnsavedWindow>,
}

impl<P: Platform, S: KeyValueStore> WorkspaceService<P, S> {
    /// Save the tabs of an open window as a new workspace.
    pub async fn save_window(&self, window_id: WindowId) -> Result<WorkspaceRecord, WorkspaceError> {
        let live = capture_window(self.platform().as_ref(), window_id).await?;
        if live.tabs.is_empty() {
            return Err(WorkspaceError::NoTabs);
        }

        let urls: Vec<String> = live.tabs.iter().map(|tab| tab.url.clone()).collect();
        let title = representative_title(&live.tabs);
        let group_ranges = live
            .groups
            .as_deref()
            .map(|groups| compute_group_ranges(&live.tabs, groups))
            .unwrap_or_default();

        let record = self
            .context
            .modify(|registry| {
                if registry.is_window_bound(window_id) {
                    return Err(WorkspaceError::AlreadySaved);
                }
                let order = registry.next_order();
                let record = registry
                    .insert_new(|id| WorkspaceRecord {
                        id,
                        window_id: Some(window_id),
                        tabs: urls,
                        title,
                        custom_title: None,
                        order,
                        group_ranges,
                    })
                    .clone();
                Ok((record, true))
            })
            .await?;

        log::info!(
            "Saved window {} as workspace {} ({} tabs)",
            window_id,
            record.id,
            record.tabs.len()
        );
        Ok(record)
    }

    /// Focus a workspace's window, or recreate it from the saved URLs.
    pub async fn open_workspace(&self, workspace_id: WorkspaceId) -> Result<OpenReply, WorkspaceError> {
        let record = self
            .context
            .registry()
            .await
            .get(workspace_id)
            .cloned()
            .ok_or(WorkspaceError::NotFound)?;

        if let Some(window_id) = record.window_id {
            match self.platform().focus_window(window_id).await {
                Ok(()) => {
                    log::debug!("Workspace {} already open in window {}", workspace_id, window_id);
                    return Ok(OpenReply {
                        message: OpenReply::FOCUSED.to_string(),
                        window_id,
                    });
                }
                Err(e) => log::info!(
                    "Window {} of workspace {} is gone ({}); recreating",
                    window_id,
                    workspace_id,
                    e
                ),
            }
        }

        let window_id = self.recreate(&record).await?;

        let rebound = self
            .context
            .modify(|registry| {
                let bound = registry.bind(workspace_id, window_id);
                Ok((bound, bound))
            })
            .await?;
        if !rebound {
            log::warn!(
                "Workspace {} was removed while window {} was opening",
                workspace_id,
                window_id
            );
        }

        log::info!("Opened workspace {} in window {}", workspace_id, window_id);
        Ok(OpenReply {
            message: OpenReply::OPENED.to_string(),
            window_id,
        })
    }

    /// Create a window for `record`, wait for its tabs and replay its layout.
    async fn recreate(&self, record: &WorkspaceRecord) -> Result<WindowId, WorkspaceError> {
        let platform = self.platform().as_ref();
        let settings = self.settings();

        let urls = sanitize(&record.tabs);
        let window_id = platform.create_window(&urls).await?;

        if !record.group_ranges.is_empty() {
            let tabs = wait_for_tabs(
                platform,
                window_id,
                urls.len().max(1),
                settings.materialize_retries,
                settings.materialize_interval,
            )
            .await;
            let restored = replay_groups(platform, window_id, &tabs, &record.group_ranges).await;
            log::debug!(
                "Restored {}/{} tab groups in window {}",
                restored,
                record.group_ranges.len(),
                window_id
            );
        }

        if let Some(title) = &record.custom_title {
            self.push_title_prefix(window_id, title).await;
        }
        Ok(window_id)
    }

    async fn push_title_prefix(&self, window_id: WindowId, title: &str) {
        let settings = self.settings();
        if !settings.window_title_prefix {
            return;
        }
        // An empty title clears the prefix rather than leaving a bare separator.
        let prefix = if title.is_empty() {
            String::new()
        } else {
            format!("{}{}", title, settings.title_prefix_separator)
        };
        if let Err(e) = self
            .platform()
            .set_window_title_prefix(window_id, &prefix)
            .await
        {
            log::warn!("Failed to set title prefix of window {}: {}", window_id, e);
        }
    }

    /// Delete a workspace. Its window, if any, stays open.
    pub async fn unsave_workspace(&self, workspace_id: WorkspaceId) -> Result<(), WorkspaceError> {
        let removed = self
            .context
            .modify(|registry| {
                let removed = registry
                    .remove(workspace_id)
                    .ok_or(WorkspaceError::NotFound)?;
                Ok((removed, true))
            })
            .await?;
        log::info!("Removed workspace {} ({})", workspace_id, removed.title);
        Ok(())
    }

    /// Give a workspace a custom title that reconciliation leaves alone.
    pub async fn rename_workspace(
        &self,
        workspace_id: WorkspaceId,
        new_title: &str,
    ) -> Result<(), WorkspaceError> {
        let window_id = self
            .context
            .modify(|registry| {
                let record = registry
                    .get_mut(workspace_id)
                    .ok_or(WorkspaceError::NotFound)?;
                record.set_custom_title(new_title);
                Ok((record.window_id, true))
            })
            .await?;

        if let Some(window_id) = window_id {
            self.push_title_prefix(window_id, new_title).await;
        }
        log::info!("Renamed workspace {} to {:?}", workspace_id, new_title);
        Ok(())
    }

    /// Rewrite the display order of every workspace.
    pub async fn update_order(&self, ids: &[WorkspaceId]) -> Result<(), WorkspaceError> {
        self.context
            .modify(|registry| {
                registry.apply_order(ids);
                Ok(((), true))
            })
            .await
    }

    /// Focus any window. The store is not involved.
    pub async fn focus_window(&self, window_id: WindowId) -> Result<(), WorkspaceError> {
        self.platform().focus_window(window_id).await?;
        Ok(())
    }

    /// Saved workspaces in display order plus the open windows not yet saved,
    /// most recently focused first.
    pub async fn get_state(&self) -> Result<StateReply, WorkspaceError> {
        let registry = self.context.registry().await;
        let windows = self.platform().list_windows().await?;

        let mut unsaved: Vec<UnsavedWindow> = windows
            .into_iter()
            .filter(|window| !registry.is_window_bound(window.id))
            .map(|window| UnsavedWindow {
                window_id: window.id,
                title: representative_title(&window.tabs),
                tab_count: window.tabs.len(),
                last_active: self.last_active(window.id).unwrap_or(0),
            })
            .collect();
        unsaved.sort_by_key(|window| (Reverse(window.last_active), window.window_id));

        let saved = registry.workspaces_in_order().into_iter().cloned().collect();
        Ok(StateReply { saved, unsaved })
    }

    /// The whole store.
    pub async fn export(&self) -> StoreRoot {
        self.context.registry().await.into_root()
    }

    /// Replace the whole store with `data`.
    ///
    /// `data` must be an object with a `workspaces` object and a numeric
    /// `nextId`; it is fully validated before anything is written.
    pub async fn import(&self, data: &Value) -> Result<(), WorkspaceError> {
        let root = parse_import(data)?;
        log::info!(
            "Importing {} workspaces (nextId={})",
            root.workspaces.len(),
            root.next_id
        );
        self.context.replace(&root).await;
        Ok(())
    }
}

/// Validate and normalize imported data.
fn parse_import(data: &Value) -> Result<StoreRoot, WorkspaceError> {
    let object = data.as_object().ok_or(WorkspaceError::InvalidImport)?;
    let entries = object
        .get(WORKSPACES_KEY)
        .and_then(Value::as_object)
        .ok_or(WorkspaceError::InvalidImport)?;
    let mut next_id = object
        .get(NEXT_ID_KEY)
        .and_then(Value::as_u64)
        .filter(|next_id| *next_id <= MAX_EXACT_INTEGER)
        .ok_or(WorkspaceError::InvalidImport)?;

    let mut workspaces = BTreeMap::new();
    for (key, value) in entries {
        let id: WorkspaceId = key.parse().map_err(|_| WorkspaceError::InvalidImport)?;
        if id > MAX_EXACT_INTEGER {
            log::warn!("Rejecting import, workspace id {} is out of range", id);
            return Err(WorkspaceError::InvalidImport);
        }
        let mut record: WorkspaceRecord =
            serde_json::from_value(value.clone()).map_err(|e| {
                log::warn!("Rejecting import, workspace {} is malformed: {}", key, e);
                WorkspaceError::InvalidImport
            })?;
        if record.order.unsigned_abs() > MAX_EXACT_INTEGER {
            log::warn!(
                "Rejecting import, workspace {} has out-of-range order {}",
                id,
                record.order
            );
            return Err(WorkspaceError::InvalidImport);
        }
        if record.id != id {
            log::warn!(
                "Imported workspace under key {} carries id {}; using the key",
                id,
                record.id
            );
            record.id = id;
        }
        workspaces.insert(id, record);
    }

    let root = StoreRoot {
        workspaces,
        next_id,
    };
    let min_next_id = root.min_next_id();
    if next_id < min_next_id {
        log::warn!(
            "Imported nextId {} would reuse ids; raising it to {}",
            next_id,
            min_next_id
        );
        next_id = min_next_id;
    }
    Ok(StoreRoot { next_id, ..root })
}
