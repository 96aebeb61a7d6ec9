//! Config manager for loading settings and writing a starter file.
//!
//! Key features:
//! - Relative paths resolved against the config file's own directory
//! - Validation once at load time
//! - Atomic writes (write to temp file, then rename)

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::settings::Settings;

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid config value for '{field}': {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Loads settings from an optional TOML file.
pub struct ConfigManager {
    /// Path to the config file (None = built-in defaults only).
    config_path: Option<PathBuf>,
    /// Current settings.
    settings: Settings,
}

impl ConfigManager {
    /// Manager for the given config file. Call `load()` afterwards.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(config_path.into()),
            settings: Settings::default(),
        }
    }

    /// Manager using only built-in defaults, anchored at the working directory.
    pub fn defaults() -> Self {
        Self {
            config_path: None,
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Load, resolve and validate.
    ///
    /// Without a config path, defaults are resolved against the current
    /// working directory.
    pub fn load(&mut self) -> ConfigResult<()> {
        let cwd = env::current_dir()?;

        let settings = match self.config_path.clone() {
            Some(raw_path) => {
                let path = absolute_config_path(&raw_path, &cwd);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path));
                }

                let content = fs::read_to_string(&path)?;
                let mut settings: Settings = toml::from_str(&content)?;

                let base_dir = path.parent().unwrap_or(cwd.as_path()).to_path_buf();
                settings.resolve_paths(&base_dir);
                self.config_path = Some(path);
                settings
            }
            None => {
                let mut settings = Settings::default();
                settings.resolve_paths(&cwd);
                settings
            }
        };

        settings.validate()?;
        tracing::debug!("Loaded settings: {:?}", settings);
        self.settings = settings;
        Ok(())
    }

    /// Write the default settings to `path` as a commented TOML file.
    ///
    /// Refuses to overwrite an existing file.
    pub fn write_default(path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(ConfigError::invalid(
                "path",
                format!("{} already exists", path.display()),
            ));
        }

        let mut output = String::new();
        output.push_str("# atacflow configuration\n");
        output.push_str("# Relative paths are resolved against this file's directory.\n\n");
        output.push_str(&toml::to_string_pretty(&Settings::default())?);

        atomic_write(path, &output)?;
        Ok(())
    }
}

/// Expand `~/` and make the config path absolute against `cwd`.
fn absolute_config_path(raw: &Path, cwd: &Path) -> PathBuf {
    let expanded = match (raw.strip_prefix("~"), env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => raw.to_path_buf(),
    };

    if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    }
}

/// Write to a temp file in the same directory, then rename.
fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}
