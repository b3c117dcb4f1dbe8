//! Debounced reconciliation scheduler.
//!
//! Windows that saw tab or group activity are collected in a pending set.
//! Every notification restarts a single quiet-period timer; when it finally
//! fires, the whole set is drained and handed to one [`ReconcilePass`], which
//! reconciles each window and persists once.
//!
//! Notifications arriving while a pass is running go into a fresh pending set
//! and arm the next cycle. A timer that has already fired is never aborted.

use crate::workspace::{WindowId, is_valid_window_id};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// The work a fired timer performs.
pub trait ReconcilePass: Send + Sync + 'static {
    /// Reconcile every window in `windows` and persist the result once.
    fn reconcile_windows(&self, windows: Vec<WindowId>) -> impl Future<Output = ()> + Send;
}

/// Timer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceSettings {
    /// Quiet period after the last notification
    pub quiet: Duration,
    /// Upper bound on how long the first pending window may wait
    pub max_delay: Option<Duration>,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            quiet: Duration::from_millis(800),
            max_delay: None,
        }
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    pending: BTreeSet<WindowId>,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the armed timer is replaced or cancelled
    generation: u64,
    first_pending_at: Option<Instant>,
}

struct Inner<R> {
    pass: Arc<R>,
    settings: DebounceSettings,
    state: Mutex<SchedulerState>,
}

impl<R: ReconcilePass> Inner<R> {
    /// Take the pending batch if `generation` is still the armed timer.
    fn take_batch(&self, generation: u64) -> Option<Vec<WindowId>> {
        let mut state = self.state.lock();
        if state.generation != generation {
            return None;
        }
        state.timer = None;
        state.first_pending_at = None;
        let batch = std::mem::take(&mut state.pending);
        Some(batch.into_iter().collect())
    }

    async fn fire(&self, generation: u64) {
        let Some(batch) = self.take_batch(generation) else {
            return;
        };
        if batch.is_empty() {
            return;
        }
        log::debug!("Debounce elapsed, reconciling {} window(s)", batch.len());
        self.pass.reconcile_windows(batch).await;
    }
}

/// Coalesces reconciliation requests behind a single debounce timer.
///
/// Must be used from within a tokio runtime.
pub struct ReconcileScheduler<R> {
    inner: Arc<Inner<R>>,
}

impl<R> std::fmt::Debug for ReconcileScheduler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ReconcileScheduler")
            .field("settings", &self.inner.settings)
            .field("pending", &state.pending)
            .field("armed", &state.timer.is_some())
            .finish()
    }
}

impl<R: ReconcilePass> ReconcileScheduler<R> {
    pub fn new(pass: Arc<R>, settings: DebounceSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                pass,
                settings,
                state: Mutex::new(SchedulerState::default()),
            }),
        }
    }

    pub fn settings(&self) -> DebounceSettings {
        self.inner.settings
    }

    /// Queue `window_id` and restart the quiet period.
    ///
    /// Invalid window ids are ignored.
    pub fn notify(&self, window_id: WindowId) {
        if !is_valid_window_id(window_id) {
            return;
        }

        let now = Instant::now();
        let mut state = self.inner.state.lock();
        state.pending.insert(window_id);

        let first = *state.first_pending_at.get_or_insert(now);
        let mut deadline = now + self.inner.settings.quiet;
        if let Some(max_delay) = self.inner.settings.max_delay {
            deadline = deadline.min(first + max_delay);
        }

        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation += 1;
        let generation = state.generation;

        let inner = Arc::clone(&self.inner);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            inner.fire(generation).await;
        }));
        log::trace!(
            "Window {} queued for reconcile ({} pending)",
            window_id,
            state.pending.len()
        );
    }

    /// Drop a window from the pending set. Disarms the timer when nothing is
    /// left to do.
    pub fn forget(&self, window_id: WindowId) {
        let mut state = self.inner.state.lock();
        state.pending.remove(&window_id);
        if state.pending.is_empty() {
            disarm(&mut state);
        }
    }

    /// Run the pending batch now instead of waiting for the timer.
    pub async fn flush(&self) {
        let batch: Vec<WindowId> = {
            let mut state = self.inner.state.lock();
            disarm(&mut state);
            std::mem::take(&mut state.pending).into_iter().collect()
        };
        if batch.is_empty() {
            return;
        }
        log::debug!("Flushing {} pending window(s)", batch.len());
        self.inner.pass.reconcile_windows(batch).await;
    }

    /// Windows waiting for the next pass.
    pub fn pending(&self) -> Vec<WindowId> {
        self.inner.state.lock().pending.iter().copied().collect()
    }

    /// Whether a timer is waiting to fire.
    pub fn is_armed(&self) -> bool {
        self.inner.state.lock().timer.is_some()
    }
}

fn disarm(state: &mut SchedulerState) {
    if let Some(timer) = state.timer.take() {
        timer.abort();
    }
    state.generation += 1;
    state.first_pending_at = None;
}

impl<R> Drop for ReconcileScheduler<R> {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.state.lock().timer.take() {
            timer.abort();
        }
    }
}
