//! Workspace data model: saved windows, their tab lists and tab-group layout.
//!
//! The persisted layout is a [`StoreRoot`] with two top-level keys,
//! `workspaces` (id -> record) and `nextId`. Field names are camelCase so
//! exported data matches what the extension UI reads and writes.

pub mod registry;

pub use registry::WorkspaceRegistry;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for a saved workspace. Never reused.
pub type WorkspaceId = u64;

/// Platform window identifier.
pub type WindowId = i64;

/// Platform tab identifier.
pub type TabId = i64;

/// Platform tab-group identifier.
pub type GroupId = i64;

/// Sentinel window id the platform reports when no window has focus.
pub const WINDOW_ID_NONE: WindowId = -1;

/// First id handed out by an empty store.
pub const FIRST_WORKSPACE_ID: WorkspaceId = 1;

/// Largest integer the extension UI (JavaScript numbers) holds exactly.
/// Ids, `nextId` and `order` values beyond it are rejected on import.
pub const MAX_EXACT_INTEGER: u64 = (1 << 53) - 1;

/// Whether a platform window id refers to a real window.
pub fn is_valid_window_id(window_id: WindowId) -> bool {
    window_id >= 0
}

/// Tab-group colors offered by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    #[default]
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

/// A contiguous run of grouped tabs captured from a window.
///
/// `start` and `end` are inclusive indices into the workspace's `tabs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRange {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub color: GroupColor,
    #[serde(default)]
    pub collapsed: bool,
}

/// A saved workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRecord {
    /// Immutable id assigned from the store's `nextId` counter
    pub id: WorkspaceId,

    /// Live window currently bound to this workspace, `None` once it closed
    #[serde(default)]
    pub window_id: Option<WindowId>,

    /// Last known tab URLs in browser tab order
    #[serde(default)]
    pub tabs: Vec<String>,

    /// Display title
    #[serde(default)]
    pub title: String,

    /// User-chosen title; suppresses automatic title updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_title: Option<String>,

    /// Display position among saved workspaces
    #[serde(default)]
    pub order: i64,

    /// Tab-group layout captured at save/update time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_ranges: Vec<GroupRange>,
}

impl WorkspaceRecord {
    /// Whether the title is pinned by the user.
    pub fn has_custom_title(&self) -> bool {
        self.custom_title.is_some()
    }

    /// Pin a user-chosen title, mirroring it into `title`.
    pub fn set_custom_title(&mut self, title: &str) {
        self.custom_title = Some(title.to_string());
        self.title = title.to_string();
    }
}

/// Everything persisted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRoot {
    #[serde(default)]
    pub workspaces: BTreeMap<WorkspaceId, WorkspaceRecord>,
    #[serde(default = "default_next_id")]
    pub next_id: WorkspaceId,
}

fn default_next_id() -> WorkspaceId {
    FIRST_WORKSPACE_ID
}

impl Default for StoreRoot {
    fn default() -> Self {
        Self {
            workspaces: BTreeMap::new(),
            next_id: FIRST_WORKSPACE_ID,
        }
    }
}

impl StoreRoot {
    /// Smallest `nextId` that keeps every existing id below the counter.
    pub fn min_next_id(&self) -> WorkspaceId {
        self.workspaces
            .keys()
            .next_back()
            .map(|max| max.saturating_add(1))
            .unwrap_or(FIRST_WORKSPACE_ID)
    }
}
