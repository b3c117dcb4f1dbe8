//! Logging infrastructure for tabshelf.
//!
//! [`init_log_bridge`] installs a `log` backend that routes every
//! `log::info!()` and friends to `<temp dir>/tabshelf_debug.log`. When
//! `RUST_LOG` is set, lines are mirrored to stderr as well. The file keeps
//! diagnostics out of stdout, which the CLI uses for JSON output.
//!
//! Level precedence: `--log-level`, then `RUST_LOG`, then the config file.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use tabshelf_config::LogLevel;

/// Path of the debug log file.
pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("tabshelf_debug.log")
}

/// Pick the effective level from the CLI flag, `RUST_LOG` and the config.
///
/// An unparseable `RUST_LOG` (e.g. a module filter) is ignored.
pub fn resolve_level(cli: Option<LogLevel>, rust_log: Option<&str>, config: LogLevel) -> LogLevel {
    cli.or_else(|| rust_log.and_then(LogLevel::parse))
        .unwrap_or(config)
}

struct BridgeLogger {
    level: log::LevelFilter,
    file: Mutex<Option<File>>,
    mirror_stderr: bool,
}

impl log::Log for BridgeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record.level(), record.target(), &record.args().to_string());

        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.write_all(line.as_bytes());
        }
        if self.mirror_stderr {
            eprint!("{line}");
        }
    }

    fn flush(&self) {
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

fn format_line(level: log::Level, target: &str, message: &str) -> String {
    format!(
        "[{}] [{:<5}] [{}] {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        level,
        target,
        message
    )
}

static LOGGER: OnceLock<BridgeLogger> = OnceLock::new();

/// Install the file logger at `level`.
///
/// Returns `false` when another logger was installed first. A log file that
/// cannot be opened is silently skipped.
pub fn init_log_bridge(level: LogLevel) -> bool {
    let filter = level.to_level_filter();
    let mirror_stderr = std::env::var_os("RUST_LOG").is_some();

    let logger = LOGGER.get_or_init(|| {
        let file = if filter == log::LevelFilter::Off {
            None
        } else {
            OpenOptions::new()
                .write(true)
                .truncate(true)
                .create(true)
                .open(log_path())
                .ok()
        };
        BridgeLogger {
            level: filter,
            file: Mutex::new(file),
            mirror_stderr,
        }
    });

    if log::set_logger(logger).is_err() {
        return false;
    }
    log::set_max_level(logger.level);
    log::info!(
        "tabshelf {} debug session started (level={})",
        env!("CARGO_PKG_VERSION"),
        level.display_name()
    );
    true
}

// Category-tagged convenience macros. The category becomes the log target.
#[macro_export]
macro_rules! debug_error {
    ($category:expr, $($arg:tt)*) => {
        ::log::error!(target: $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug_info {
    ($category:expr, $($arg:tt)*) => {
        ::log::info!(target: $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug_log {
    ($category:expr, $($arg:tt)*) => {
        ::log::debug!(target: $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug_trace {
    ($category:expr, $($arg:tt)*) => {
        ::log::trace!(target: $category, $($arg)*)
    };
}
