//! The `Config` struct and its persistence methods.

use crate::error::ConfigError;
use crate::types::LogLevel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Engine configuration, stored as YAML in `~/.config/tabshelf/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // ========================================================================
    // Reconciliation scheduler
    // ========================================================================
    /// Quiet period in milliseconds: reconciliation runs once no window change
    /// has been reported for this long.
    #[serde(default = "crate::defaults::debounce_ms")]
    pub debounce_ms: u64,

    /// Upper bound on how long a pending change may wait for reconciliation
    /// while events keep arriving. `None` lets a continuous stream of events
    /// postpone reconciliation indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_debounce_delay_ms: Option<u64>,

    // ========================================================================
    // Window recreation
    // ========================================================================
    /// How many times to poll a freshly created window for its tabs before
    /// replaying tab groups against whatever exists.
    #[serde(default = "crate::defaults::materialize_retries")]
    pub materialize_retries: u32,

    /// Sleep between materialization polls, in milliseconds.
    #[serde(default = "crate::defaults::materialize_interval_ms")]
    pub materialize_interval_ms: u64,

    // ========================================================================
    // Persistent store
    // ========================================================================
    /// Location of the workspace store file. Defaults to
    /// `<data dir>/tabshelf/workspaces.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    /// Number of attempts for each store write before the write is dropped.
    #[serde(default = "crate::defaults::store_write_attempts")]
    pub store_write_attempts: u32,

    /// Delay between store write attempts, in milliseconds.
    #[serde(default = "crate::defaults::store_retry_backoff_ms")]
    pub store_retry_backoff_ms: u64,

    // ========================================================================
    // Window titles
    // ========================================================================
    /// Prefix the OS window title with the workspace name after a rename.
    #[serde(default = "crate::defaults::bool_true")]
    pub window_title_prefix: bool,

    /// Text placed between the workspace name and the page title.
    #[serde(default = "crate::defaults::title_prefix_separator")]
    pub title_prefix_separator: String,

    // ========================================================================
    // Logging
    // ========================================================================
    #[serde(default = "crate::defaults::log_level")]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: crate::defaults::debounce_ms(),
            max_debounce_delay_ms: None,
            materialize_retries: crate::defaults::materialize_retries(),
            materialize_interval_ms: crate::defaults::materialize_interval_ms(),
            store_path: None,
            store_write_attempts: crate::defaults::store_write_attempts(),
            store_retry_backoff_ms: crate::defaults::store_retry_backoff_ms(),
            window_title_prefix: crate::defaults::bool_true(),
            title_prefix_separator: crate::defaults::title_prefix_separator(),
            log_level: crate::defaults::log_level(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing or empty file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        log::info!("Config path: {:?}", path);
        if !path.exists() {
            log::info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(ConfigError::from)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml_ng::from_str(&contents)
            .map_err(ConfigError::from)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let yaml = serde_yaml_ng::to_string(self).context("Failed to serialize config")?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml)
            .with_context(|| format!("Failed to write config to {:?}", temp_path))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to move config into place at {:?}", path))?;

        log::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check field values that serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "debounce_ms must be greater than 0".to_string(),
            ));
        }
        if self.materialize_retries == 0 {
            return Err(ConfigError::Validation(
                "materialize_retries must be at least 1".to_string(),
            ));
        }
        if self.store_write_attempts == 0 {
            return Err(ConfigError::Validation(
                "store_write_attempts must be at least 1".to_string(),
            ));
        }
        if let Some(ceiling) = self.max_debounce_delay_ms
            && ceiling < self.debounce_ms
        {
            return Err(ConfigError::Validation(format!(
                "max_debounce_delay_ms ({ceiling}) must not be shorter than debounce_ms ({})",
                self.debounce_ms
            )));
        }
        Ok(())
    }

    /// Get the configuration directory (XDG convention on every platform
    /// except Windows).
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join("tabshelf")
            } else {
                PathBuf::from(".")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(".config").join("tabshelf")
            } else {
                PathBuf::from(".")
            }
        }
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Default location of the workspace store.
    pub fn default_store_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tabshelf")
            .join("workspaces.json")
    }

    /// The store path to use: the configured one or the default.
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(Self::default_store_path)
    }
}
