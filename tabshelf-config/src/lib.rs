//! Configuration system for the tabshelf workspace engine.
//!
//! This crate provides configuration loading, saving, and default values
//! for the engine. It includes:
//!
//! - Scheduler timing (debounce quiet period and optional ceiling)
//! - Window recreation polling bounds
//! - Persistent store location and write retry policy
//! - Window title prefix behaviour
//! - Log verbosity

pub mod config;
pub mod defaults;
pub mod error;
mod types;

// Re-export main types for convenience
pub use config::Config;
pub use error::ConfigError;
pub use types::LogLevel;
