//! Snapshot a live window's tabs and tab groups.

use crate::platform::{Platform, PlatformError, TabGroupInfo, TabInfo};
use crate::workspace::WindowId;

/// What a window looks like right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveWindow {
    pub tabs: Vec<TabInfo>,
    /// `None` when group state is unavailable; stored layouts are then kept
    pub groups: Option<Vec<TabGroupInfo>>,
}

/// Query the tabs and groups of `window_id`.
///
/// A missing window is an error. Any other failure of the group query is
/// logged and reported as "no group information".
pub async fn capture_window<P: Platform>(
    platform: &P,
    window_id: WindowId,
) -> Result<LiveWindow, PlatformError> {
    let tabs = platform.window_tabs(window_id).await?;
    let groups = match platform.window_groups(window_id).await {
        Ok(groups) => groups,
        Err(e @ PlatformError::WindowNotFound(_)) => return Err(e),
        Err(e) => {
            log::warn!("Could not read tab groups of window {}: {}", window_id, e);
            None
        }
    };
    Ok(LiveWindow { tabs, groups })
}
