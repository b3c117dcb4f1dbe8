//! The browser surface the engine drives.
//!
//! The engine never talks to a browser directly: it enumerates tabs and
//! windows, creates and focuses windows, and groups tabs through the
//! [`Platform`] trait. A real extension host implements it over the browser's
//! extension API; [`memory::MemoryPlatform`] models a browser in-process.

pub mod memory;

use crate::workspace::{GroupColor, GroupId, TabId, WindowId};
use std::future::Future;
use thiserror::Error;

/// A live tab as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub title: String,
    pub active: bool,
    /// Group the tab belongs to, if any
    pub group_id: Option<GroupId>,
}

/// Metadata of a live tab group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabGroupInfo {
    pub id: GroupId,
    pub title: String,
    pub color: GroupColor,
    pub collapsed: bool,
}

/// An open window and its tabs, in tab order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub focused: bool,
    pub tabs: Vec<TabInfo>,
}

/// Properties applied to a tab group after it is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupUpdate {
    pub title: String,
    pub color: GroupColor,
    pub collapsed: bool,
}

/// Failures reported by platform calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The window does not exist (usually: it was closed).
    #[error("No window with id: {0}")]
    WindowNotFound(WindowId),

    #[error("No tab with id: {0}")]
    TabNotFound(TabId),

    #[error("No tab group with id: {0}")]
    GroupNotFound(GroupId),

    /// The platform has no tab-group support.
    #[error("Tab groups are not supported")]
    Unsupported,

    /// Any other failure surfaced by the browser API.
    #[error("{0}")]
    Call(String),
}

/// Window, tab and tab-group operations consumed by the engine.
///
/// Tab lists are always returned in tab order.
pub trait Platform: Send + Sync + 'static {
    /// Tabs of one window.
    fn window_tabs(
        &self,
        window_id: WindowId,
    ) -> impl Future<Output = Result<Vec<TabInfo>, PlatformError>> + Send;

    /// Tab groups of one window, or `None` when the platform has no tab
    /// groups.
    fn window_groups(
        &self,
        window_id: WindowId,
    ) -> impl Future<Output = Result<Option<Vec<TabGroupInfo>>, PlatformError>> + Send;

    /// Every open normal window with its tabs.
    fn list_windows(&self) -> impl Future<Output = Result<Vec<WindowInfo>, PlatformError>> + Send;

    /// Open a new window with `urls`, returning its id. Tabs may appear
    /// asynchronously after this returns.
    fn create_window(
        &self,
        urls: &[String],
    ) -> impl Future<Output = Result<WindowId, PlatformError>> + Send;

    /// Bring a window to the front.
    fn focus_window(
        &self,
        window_id: WindowId,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Put `tab_ids` into a new group in `window_id`.
    fn group_tabs(
        &self,
        window_id: WindowId,
        tab_ids: &[TabId],
    ) -> impl Future<Output = Result<GroupId, PlatformError>> + Send;

    /// Set a group's title, color and collapsed state.
    fn update_group(
        &self,
        group_id: GroupId,
        update: &GroupUpdate,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Prefix the OS-level title of a window.
    fn set_window_title_prefix(
        &self,
        window_id: WindowId,
        prefix: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
}

/// The tab that names a window: the active tab, else the last one.
pub fn representative_tab(tabs: &[TabInfo]) -> Option<&TabInfo> {
    tabs.iter().find(|tab| tab.active).or_else(|| tabs.last())
}

/// Display title for a window's tab list.
///
/// Uses the representative tab's title, then its URL, then `"Untitled"`.
pub fn representative_title(tabs: &[TabInfo]) -> String {
    match representative_tab(tabs) {
        Some(tab) if !tab.title.trim().is_empty() => tab.title.clone(),
        Some(tab) if !tab.url.is_empty() => tab.url.clone(),
        _ => "Untitled".to_string(),
    }
}
