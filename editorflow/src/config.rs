//! Configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `EDITORFLOW_WINDOW_MS` | No | 60000 | Aggregation window length in milliseconds |
//! | `EDITORFLOW_WORKSPACE_FOLDERS` | No | (none) | Comma-separated workspace roots |
//! | `EDITORFLOW_CHANNEL_CAPACITY` | No | 1000 | Service input channel capacity |
//!
//! # Example
//!
//! ```no_run
//! use editorflow::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Window: {:?}", config.window_duration);
//! ```

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::window::DEFAULT_WINDOW_MS;

/// Default service input channel capacity.
const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

const WINDOW_MS_VAR: &str = "EDITORFLOW_WINDOW_MS";
const WORKSPACE_FOLDERS_VAR: &str = "EDITORFLOW_WORKSPACE_FOLDERS";
const CHANNEL_CAPACITY_VAR: &str = "EDITORFLOW_CHANNEL_CAPACITY";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How long an aggregation window stays open after its first activity.
    pub window_duration: Duration,

    /// Workspace roots used to resolve a file's project, in priority order.
    pub workspace_folders: Vec<String>,

    /// Capacity of the flow service's input channel.
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_duration: Duration::from_millis(DEFAULT_WINDOW_MS),
            workspace_folders: Vec::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `EDITORFLOW_WINDOW_MS` or
    /// `EDITORFLOW_CHANNEL_CAPACITY` is set but is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let window_ms = match env::var(WINDOW_MS_VAR) {
            Ok(val) => parse_positive::<u64>(WINDOW_MS_VAR, &val)?,
            Err(_) => DEFAULT_WINDOW_MS,
        };

        let workspace_folders = env::var(WORKSPACE_FOLDERS_VAR)
            .map(|val| parse_list(&val))
            .unwrap_or_default();

        let channel_capacity = match env::var(CHANNEL_CAPACITY_VAR) {
            Ok(val) => parse_positive::<usize>(CHANNEL_CAPACITY_VAR, &val)?,
            Err(_) => DEFAULT_CHANNEL_CAPACITY,
        };

        Ok(Self {
            window_duration: Duration::from_millis(window_ms),
            workspace_folders,
            channel_capacity,
        })
    }

    #[must_use]
    pub fn with_window_duration(mut self, window_duration: Duration) -> Self {
        self.window_duration = window_duration;
        self
    }

    #[must_use]
    pub fn with_workspace_folders(mut self, folders: Vec<String>) -> Self {
        self.workspace_folders = folders;
        self
    }
}

fn parse_positive<T>(key: &str, val: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let parsed = val
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected positive integer, got '{val}'"),
        })?;
    if parsed == T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "value must be greater than 0".to_string(),
        });
    }
    Ok(parsed)
}

fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
