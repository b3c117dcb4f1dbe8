//! Shared integration test helpers for tabshelf.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::{Harness, record};
//! ```
//!
//! Rust integration tests use `mod common;` (not `use`) to bring in helpers
//! from `tests/common/mod.rs`. The `#[allow(dead_code)]` attribute suppresses
//! warnings when only a subset of helpers are used per file.

#![allow(dead_code)]

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tabshelf::events::PlatformEvent;
use tabshelf::platform::memory::MemoryPlatform;
use tabshelf::scheduler::DebounceSettings;
use tabshelf::store::{NEXT_ID_KEY, WORKSPACES_KEY};
use tabshelf::workspace::{StoreRoot, WindowId, WorkspaceId, WorkspaceRecord};
use tabshelf::{MemoryStore, ServiceSettings, WorkspaceService};
use tokio::sync::mpsc::UnboundedReceiver;

pub type TestService = WorkspaceService<MemoryPlatform, MemoryStore>;

/// Debounce quiet period used by the tests.
pub const QUIET_MS: u64 = 800;

pub fn test_settings() -> ServiceSettings {
    ServiceSettings {
        debounce: DebounceSettings {
            quiet: Duration::from_millis(QUIET_MS),
            max_delay: None,
        },
        materialize_retries: 10,
        materialize_interval: Duration::from_millis(100),
        ..ServiceSettings::default()
    }
}

/// A service wired to an in-memory browser, with the browser's event stream.
pub struct Harness {
    pub platform: Arc<MemoryPlatform>,
    pub service: Arc<TestService>,
    pub events: UnboundedReceiver<PlatformEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_platform(MemoryPlatform::new(), MemoryStore::new())
    }

    pub fn with_platform(platform: MemoryPlatform, store: MemoryStore) -> Self {
        Self::with_settings(platform, store, test_settings())
    }

    pub fn with_settings(platform: MemoryPlatform, store: MemoryStore, settings: ServiceSettings) -> Self {
        let platform = Arc::new(platform);
        let events = platform.subscribe();
        let service = Arc::new(WorkspaceService::new(Arc::clone(&platform), store, settings));
        Self {
            platform,
            service,
            events,
        }
    }

    /// Deliver every event published so far to the service.
    pub async fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.events.try_recv() {
            self.service.handle_event(event).await;
            delivered += 1;
        }
        delivered
    }

    /// Discard published events without handling them.
    pub fn discard_events(&mut self) {
        while self.events.try_recv().is_ok() {}
    }

    pub async fn stored(&self) -> StoreRoot {
        self.service.export().await
    }

    pub async fn workspace(&self, id: WorkspaceId) -> Option<WorkspaceRecord> {
        self.stored().await.workspaces.get(&id).cloned()
    }

    pub fn urls(&self, window_id: WindowId) -> Vec<String> {
        self.platform
            .tabs_of(window_id)
            .into_iter()
            .map(|tab| tab.url)
            .collect()
    }

    pub fn writes(&self) -> usize {
        self.service.store().write_attempts()
    }
}

/// Advance the (paused) clock.
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn record(
    id: WorkspaceId,
    window_id: Option<WindowId>,
    tabs: &[&str],
    title: &str,
    order: i64,
) -> WorkspaceRecord {
    WorkspaceRecord {
        id,
        window_id,
        tabs: tabs.iter().map(|t| t.to_string()).collect(),
        title: title.to_string(),
        custom_title: None,
        order,
        group_ranges: Vec::new(),
    }
}

/// A memory store pre-filled with `records`.
pub fn seeded_store(records: Vec<WorkspaceRecord>) -> MemoryStore {
    let mut root = StoreRoot::default();
    for record in records {
        root.workspaces.insert(record.id, record);
    }
    root.next_id = root.min_next_id();

    let store = MemoryStore::new();
    let workspaces: Value = serde_json::to_value(&root.workspaces).expect("serialize workspaces");
    store.insert(WORKSPACES_KEY, workspaces);
    store.insert(NEXT_ID_KEY, Value::from(root.next_id));
    store
}
