//! Window/tab event bridge.
//!
//! Platform events are translated by the pure [`translate`] function into
//! [`Command`]s; the service applies them. Keeping reception separate from
//! mutation lets the whole bridge be driven from tests with synthetic events.

use crate::workspace::{WINDOW_ID_NONE, WindowId, is_valid_window_id};

/// Lifecycle events reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    TabCreated {
        window_id: WindowId,
    },
    TabRemoved {
        window_id: WindowId,
        /// The tab went away because its whole window is closing.
        window_closing: bool,
    },
    TabUpdated {
        window_id: WindowId,
        title_changed: bool,
    },
    TabMoved {
        window_id: WindowId,
    },
    TabAttached {
        new_window_id: WindowId,
    },
    TabDetached {
        old_window_id: WindowId,
    },
    TabActivated {
        window_id: WindowId,
    },
    WindowCreated {
        window_id: WindowId,
    },
    WindowRemoved {
        window_id: WindowId,
    },
    /// Focus moved to `window_id`, or to no window at all
    /// ([`WINDOW_ID_NONE`]).
    WindowFocusChanged {
        window_id: WindowId,
    },
    TabGroupCreated {
        window_id: WindowId,
    },
    TabGroupUpdated {
        window_id: WindowId,
    },
    TabGroupMoved {
        window_id: WindowId,
    },
    TabGroupRemoved {
        window_id: WindowId,
    },
}

/// What the service should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Queue the window for the next debounced reconciliation pass.
    ScheduleReconcile(WindowId),
    /// Clear the window from every workspace right away.
    UnbindWindow(WindowId),
    /// Remember when the window was last focused (unix millis).
    RecordFocus { window_id: WindowId, at_ms: i64 },
}

/// Map an event to the command it causes, if any.
pub fn translate(event: &PlatformEvent, now_ms: i64) -> Option<Command> {
    use PlatformEvent::*;

    let command = match *event {
        TabCreated { window_id }
        | TabMoved { window_id }
        | TabActivated { window_id }
        | TabAttached {
            new_window_id: window_id,
        }
        | TabDetached {
            old_window_id: window_id,
        }
        | TabGroupCreated { window_id }
        | TabGroupUpdated { window_id }
        | TabGroupMoved { window_id }
        | TabGroupRemoved { window_id } => Command::ScheduleReconcile(window_id),

        TabRemoved {
            window_id,
            window_closing,
        } => {
            if window_closing {
                return None;
            }
            Command::ScheduleReconcile(window_id)
        }

        TabUpdated {
            window_id,
            title_changed,
        } => {
            if !title_changed {
                return None;
            }
            Command::ScheduleReconcile(window_id)
        }

        WindowRemoved { window_id } => Command::UnbindWindow(window_id),

        WindowCreated { window_id } | WindowFocusChanged { window_id } => {
            if window_id == WINDOW_ID_NONE {
                return None;
            }
            Command::RecordFocus {
                window_id,
                at_ms: now_ms,
            }
        }
    };

    let window_id = match command {
        Command::ScheduleReconcile(id) | Command::UnbindWindow(id) => id,
        Command::RecordFocus { window_id, .. } => window_id,
    };
    if !is_valid_window_id(window_id) {
        log::trace!("Ignoring {:?} for invalid window id", event);
        return None;
    }
    Some(command)
}
