//! Errors returned by workspace operations.
//!
//! Display strings are user-facing: the router passes them through verbatim
//! as the `error` field of a failed response.

use crate::platform::PlatformError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    #[error("Workspace not found.")]
    NotFound,

    #[error("Window has no tabs.")]
    NoTabs,

    #[error("Invalid import data.")]
    InvalidImport,

    /// The window is already bound to a saved workspace.
    #[error("Window is already saved.")]
    AlreadySaved,

    #[error(transparent)]
    Platform(#[from] PlatformError),
}
