//! Persistent store adapter.
//!
//! The engine persists exactly two keys, `workspaces` and `nextId`, through a
//! [`KeyValueStore`] backend. Every operation reads the whole root, mutates it
//! in memory and writes the whole root back; there is no partial update.
//!
//! [`StoreAdapter`] fails open on reads (absent or unreadable data yields the
//! defaults) and treats writes as best-effort: a failed write is retried up to
//! the configured attempt count, then logged and dropped.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::workspace::{FIRST_WORKSPACE_ID, StoreRoot, WorkspaceId, WorkspaceRecord};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Key holding the `id -> record` map.
pub const WORKSPACES_KEY: &str = "workspaces";
/// Key holding the id counter.
pub const NEXT_ID_KEY: &str = "nextId";

/// Failures of a key-value backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Async key-value storage with JSON values.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read one key; `Ok(None)` when it was never written.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Write several keys together.
    fn set(
        &self,
        entries: Vec<(String, Value)>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Retry policy for store writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Loads and saves the [`StoreRoot`] through a backend.
#[derive(Debug)]
pub struct StoreAdapter<S> {
    backend: S,
    policy: WritePolicy,
}

impl<S: KeyValueStore> StoreAdapter<S> {
    pub fn new(backend: S, policy: WritePolicy) -> Self {
        Self { backend, policy }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Read the root, substituting defaults for anything missing or broken.
    pub async fn load(&self) -> StoreRoot {
        let workspaces = match self.backend.get(WORKSPACES_KEY).await {
            Ok(Some(value)) => {
                match serde_json::from_value::<BTreeMap<WorkspaceId, WorkspaceRecord>>(value) {
                    Ok(workspaces) => workspaces,
                    Err(e) => {
                        log::error!("Stored workspaces are unreadable, starting empty: {}", e);
                        BTreeMap::new()
                    }
                }
            }
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                log::error!("Failed to read workspaces from store: {}", e);
                BTreeMap::new()
            }
        };

        let next_id = match self.backend.get(NEXT_ID_KEY).await {
            Ok(Some(value)) => value.as_u64().unwrap_or_else(|| {
                log::error!("Stored nextId is not a number: {}", value);
                FIRST_WORKSPACE_ID
            }),
            Ok(None) => FIRST_WORKSPACE_ID,
            Err(e) => {
                log::error!("Failed to read nextId from store: {}", e);
                FIRST_WORKSPACE_ID
            }
        };

        log::trace!(
            "Loaded {} workspaces (nextId={}) from store",
            workspaces.len(),
            next_id
        );
        StoreRoot {
            workspaces,
            next_id,
        }
    }

    /// Write the root. Returns whether the write landed; failures are logged
    /// and never propagated.
    pub async fn save(&self, root: &StoreRoot) -> bool {
        let workspaces = match serde_json::to_value(&root.workspaces) {
            Ok(value) => value,
            Err(e) => {
                log::error!("Failed to serialize workspaces: {}", e);
                return false;
            }
        };
        let entries = vec![
            (WORKSPACES_KEY.to_string(), workspaces),
            (NEXT_ID_KEY.to_string(), Value::from(root.next_id)),
        ];

        let attempts = self.policy.attempts.max(1);
        for attempt in 1..=attempts {
            match self.backend.set(entries.clone()).await {
                Ok(()) => {
                    log::trace!(
                        "Saved {} workspaces (nextId={})",
                        root.workspaces.len(),
                        root.next_id
                    );
                    return true;
                }
                Err(e) if attempt < attempts => {
                    log::warn!(
                        "Store write attempt {}/{} failed: {}; retrying",
                        attempt,
                        attempts,
                        e
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(e) => {
                    log::error!("Store write failed, changes were not persisted: {}", e);
                }
            }
        }
        false
    }
}
