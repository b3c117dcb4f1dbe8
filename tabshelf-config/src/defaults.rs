//! Default value functions for configuration.
//!
//! Each function is used as a `#[serde(default = "crate::defaults::...")]`
//! attribute on a `Config` field.

use crate::types::LogLevel;

// ── Primitive helpers ──────────────────────────────────────────────────────

pub fn bool_true() -> bool {
    true
}

// ── Scheduler ──────────────────────────────────────────────────────────────

/// Quiet period before a batch of window changes is reconciled.
pub fn debounce_ms() -> u64 {
    800
}

// ── Window recreation ──────────────────────────────────────────────────────

pub fn materialize_retries() -> u32 {
    10
}

pub fn materialize_interval_ms() -> u64 {
    100
}

// ── Store ──────────────────────────────────────────────────────────────────

/// A single attempt: failed writes are logged and dropped.
pub fn store_write_attempts() -> u32 {
    1
}

pub fn store_retry_backoff_ms() -> u64 {
    50
}

// ── Window titles ──────────────────────────────────────────────────────────

pub fn title_prefix_separator() -> String {
    " - ".to_string()
}

// ── Logging ────────────────────────────────────────────────────────────────

pub fn log_level() -> LogLevel {
    LogLevel::Info
}
