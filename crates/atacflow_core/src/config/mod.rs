//! Configuration management.
//!
//! This module provides:
//! - TOML configuration with `[paths]`, `[references]` and `[options]` sections
//! - Path resolution relative to the config file
//! - Validation on load
//!
//! # Example
//!
//! ```no_run
//! use atacflow_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new("config/atacflow.toml");
//! config.load().unwrap();
//!
//! println!("Raw input: {}", config.settings().paths.raw_input_dir.display());
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{OptionSettings, PathSettings, ReferenceSettings, Settings};
