//! The long-lived workspace service.
//!
//! [`WorkspaceService`] owns everything the engine keeps between calls: the
//! platform handle, the store adapter, the reconciliation scheduler and the
//! last-active map. It is constructed once at startup and driven by platform
//! events ([`WorkspaceService::handle_event`]) and by router requests (the
//! lifecycle operations in [`lifecycle`]).
//!
//! Every read-modify-write of the store runs under one async store lock, so
//! a rename racing a reconciliation pass cannot discard either write.
//! Platform calls that may be slow run outside the lock.

pub mod capture;
pub mod lifecycle;
pub mod restore;

pub use lifecycle::{OpenReply, StateReply, UnsavedWindow};

use crate::error::WorkspaceError;
use crate::events::{Command, PlatformEvent, translate};
use crate::platform::Platform;
use crate::reconcile::reconcile_window;
use crate::scheduler::{DebounceSettings, ReconcilePass, ReconcileScheduler};
use crate::store::{KeyValueStore, StoreAdapter, WritePolicy};
use crate::workspace::{StoreRoot, WindowId, WorkspaceRegistry};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tabshelf_config::Config;
use tokio::sync::mpsc;

/// Runtime parameters of the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub debounce: DebounceSettings,
    /// Tab queries made while waiting for a recreated window to fill up
    pub materialize_retries: u32,
    pub materialize_interval: Duration,
    pub write_policy: WritePolicy,
    /// Push the custom title into the OS window title
    pub window_title_prefix: bool,
    pub title_prefix_separator: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            debounce: DebounceSettings {
                quiet: Duration::from_millis(config.debounce_ms),
                max_delay: config.max_debounce_delay_ms.map(Duration::from_millis),
            },
            materialize_retries: config.materialize_retries,
            materialize_interval: Duration::from_millis(config.materialize_interval_ms),
            write_policy: WritePolicy {
                attempts: config.store_write_attempts,
                backoff: Duration::from_millis(config.store_retry_backoff_ms),
            },
            window_title_prefix: config.window_title_prefix,
            title_prefix_separator: config.title_prefix_separator.clone(),
        }
    }
}

/// State shared between the service and the scheduler's timer task.
pub(crate) struct Context<P, S> {
    platform: Arc<P>,
    store: StoreAdapter<S>,
    store_lock: tokio::sync::Mutex<()>,
    settings: ServiceSettings,
}

impl<P: Platform, S: KeyValueStore> Context<P, S> {
    /// Current store contents. Does not take the store lock.
    async fn registry(&self) -> WorkspaceRegistry {
        WorkspaceRegistry::from_root(self.store.load().await)
    }

    /// Load, mutate and save the store as one unit.
    ///
    /// `mutate` returns its result plus whether anything changed; nothing is
    /// written when it fails or reports no change.
    async fn modify<T>(
        &self,
        mutate: impl FnOnce(&mut WorkspaceRegistry) -> Result<(T, bool), WorkspaceError>,
    ) -> Result<T, WorkspaceError> {
        let _guard = self.store_lock.lock().await;
        let mut registry = self.registry().await;
        let (value, changed) = mutate(&mut registry)?;
        if changed {
            self.store.save(&registry.into_root()).await;
        }
        Ok(value)
    }

    /// Replace the whole store.
    async fn replace(&self, root: &StoreRoot) {
        let _guard = self.store_lock.lock().await;
        self.store.save(root).await;
    }
}

impl<P: Platform, S: KeyValueStore> ReconcilePass for Context<P, S> {
    async fn reconcile_windows(&self, windows: Vec<WindowId>) {
        let mut live = Vec::with_capacity(windows.len());
        for window_id in windows {
            match capture::capture_window(self.platform.as_ref(), window_id).await {
                Ok(window) => live.push((window_id, window)),
                Err(e) => log::debug!("Skipping reconcile of window {}: {}", window_id, e),
            }
        }
        if live.is_empty() {
            return;
        }

        let result = self
            .modify(|registry| {
                let mut changed = false;
                for (window_id, window) in &live {
                    changed |= reconcile_window(
                        registry,
                        *window_id,
                        &window.tabs,
                        window.groups.as_deref(),
                    );
                }
                Ok(((), changed))
            })
            .await;
        if let Err(e) = result {
            log::error!("Reconciliation pass failed: {}", e);
        }
    }
}

/// Workspace engine bound to one platform and one store.
pub struct WorkspaceService<P, S> {
    context: Arc<Context<P, S>>,
    scheduler: ReconcileScheduler<Context<P, S>>,
    /// Window id -> unix millis of the last focus, advisory and in-memory only
    last_active: Mutex<HashMap<WindowId, i64>>,
}

impl<P, S> std::fmt::Debug for WorkspaceService<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceService")
            .field("settings", &self.context.settings)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<P: Platform, S: KeyValueStore> WorkspaceService<P, S> {
    /// Create a service. Must be called from within a tokio runtime before
    /// any event is handled.
    pub fn new(platform: Arc<P>, store: S, settings: ServiceSettings) -> Self {
        let context = Arc::new(Context {
            platform,
            store: StoreAdapter::new(store, settings.write_policy),
            store_lock: tokio::sync::Mutex::new(()),
            settings,
        });
        let scheduler = ReconcileScheduler::new(Arc::clone(&context), context.settings.debounce);
        Self {
            context,
            scheduler,
            last_active: Mutex::new(HashMap::new()),
        }
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.context.platform
    }

    /// The underlying key-value backend.
    pub fn store(&self) -> &S {
        self.context.store.backend()
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.context.settings
    }

    /// Windows queued for the next reconciliation pass.
    pub fn pending_reconcile(&self) -> Vec<WindowId> {
        self.scheduler.pending()
    }

    /// Whether a reconciliation pass is scheduled.
    pub fn reconcile_armed(&self) -> bool {
        self.scheduler.is_armed()
    }

    /// Translate a platform event and apply the resulting command.
    pub async fn handle_event(&self, event: PlatformEvent) {
        let now_ms = chrono::Utc::now().timestamp_millis();
        if let Some(command) = translate(&event, now_ms) {
            self.apply(command).await;
        }
    }

    pub async fn apply(&self, command: Command) {
        match command {
            Command::ScheduleReconcile(window_id) => self.scheduler.notify(window_id),
            Command::UnbindWindow(window_id) => self.unbind_window(window_id).await,
            Command::RecordFocus { window_id, at_ms } => {
                self.last_active.lock().insert(window_id, at_ms);
            }
        }
    }

    /// Detach a closed window from every workspace right away.
    async fn unbind_window(&self, window_id: WindowId) {
        self.scheduler.forget(window_id);
        self.last_active.lock().remove(&window_id);

        let result = self
            .context
            .modify(|registry| {
                let unbound = registry.unbind_window(window_id);
                if !unbound.is_empty() {
                    log::info!(
                        "Window {} closed, unbound workspace(s) {:?}",
                        window_id,
                        unbound
                    );
                }
                Ok(((), !unbound.is_empty()))
            })
            .await;
        if let Err(e) = result {
            log::error!("Failed to unbind window {}: {}", window_id, e);
        }
    }

    /// Last recorded focus time of a window, if any.
    pub fn last_active(&self, window_id: WindowId) -> Option<i64> {
        self.last_active.lock().get(&window_id).copied()
    }

    /// Handle events until the sender side closes, then flush pending work.
    pub async fn run_event_loop(&self, mut events: mpsc::UnboundedReceiver<PlatformEvent>) {
        log::info!("Event loop started");
        while let Some(event) = events.recv().await {
            crate::debug_trace!("events", "Platform event: {:?}", event);
            self.handle_event(event).await;
        }
        self.shutdown().await;
        log::info!("Event loop stopped");
    }

    /// Run any pending reconciliation immediately.
    pub async fn shutdown(&self) {
        self.scheduler.flush().await;
    }
}
