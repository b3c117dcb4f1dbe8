// Library exports for the binary, the integration tests and embedding hosts
//
// # Mutex Usage Policy
//
// tabshelf uses two mutex types. New code should follow these rules:
//
//   - `tokio::sync::Mutex`    : use for locks held across `.await`, i.e. the
//                               service's store lock that spans a store load,
//                               an in-memory mutation and a store save, and the
//                               file store's write lock.
//
//   - `parking_lot::Mutex`    : use for sync-only state touched briefly from
//                               async code (scheduler pending set, last-active
//                               map, in-memory platform and store). A guard
//                               must never be held across `.await`.

/// Application version (root crate version).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod cli;
pub mod error;
pub mod events;
pub mod platform;
pub mod reconcile;
pub mod router;
pub mod sanitize;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod workspace;

pub use error::WorkspaceError;
pub use events::{Command, PlatformEvent};
pub use platform::Platform;
pub use router::{Request, Response, Router, RouterHandle};
pub use service::{ServiceSettings, WorkspaceService};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use workspace::{StoreRoot, WorkspaceId, WorkspaceRecord};
