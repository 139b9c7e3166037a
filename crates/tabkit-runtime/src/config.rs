//! Shell configuration loaded from TOML.
//!
//! ```toml
//! # tabkit.toml
//! state_dir = ".tabkit"
//! debounce_ms = 450
//! history_limit = 50
//! persist = true
//! ```
//!
//! Every field is optional; missing fields take the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tabkit_tabs::DEFAULT_HISTORY_LIMIT;

/// Default quiet period before a persistence write.
pub const DEFAULT_DEBOUNCE_MS: u64 = 450;

/// Upper bound accepted for `debounce_ms`.
pub const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Errors that can occur when loading a shell configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Directory holding the persisted blobs.
    pub state_dir: PathBuf,
    /// Quiet period before persisting, in milliseconds.
    pub debounce_ms: u64,
    /// Entries kept per panel navigation history.
    pub history_limit: usize,
    /// Whether mutations are persisted at all.
    pub persist: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".tabkit"),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            persist: true,
        }
    }
}

impl ShellConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Validate and return human-readable errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.debounce_ms == 0 {
            errors.push("debounce_ms must be > 0".to_string());
        }
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            errors.push(format!(
                "debounce_ms must be <= {MAX_DEBOUNCE_MS}, got {}",
                self.debounce_ms
            ));
        }
        if self.history_limit == 0 {
            errors.push("history_limit must be > 0".to_string());
        }
        if self.persist && self.state_dir.as_os_str().is_empty() {
            errors.push("state_dir must not be empty when persist = true".to_string());
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let config = ShellConfig::from_toml_str("").expect("parse");
        assert_eq!(config, ShellConfig::default());
        assert!(config.validate().is_empty());
        assert_eq!(config.debounce(), Duration::from_millis(450));
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = ShellConfig::from_toml_str("debounce_ms = 400\npersist = false\n")
            .expect("parse");
        assert_eq!(config.debounce_ms, 400);
        assert!(!config.persist);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn validate_reports_each_problem() {
        let config = ShellConfig {
            state_dir: PathBuf::new(),
            debounce_ms: 0,
            history_limit: 0,
            persist: true,
        };
        assert_eq!(config.validate().len(), 3);
        let slow = ShellConfig {
            debounce_ms: MAX_DEBOUNCE_MS + 1,
            ..ShellConfig::default()
        };
        assert_eq!(slow.validate().len(), 1);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(matches!(
            ShellConfig::from_toml_str("debounce_ms = \"soon\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ShellConfig::from_toml_file("/nonexistent/tabkit.toml").expect_err("missing");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
