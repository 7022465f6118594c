//! Configuration module for Ubisync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation and defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for Ubisync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Root directory of the local documents mirror.
    pub root: PathBuf,
    /// File extension of the single accepted document type.
    pub accepted_extension: String,
    /// Milliseconds the local monitor waits for a change burst to settle.
    pub debounce_ms: u64,
    /// Milliseconds between batched cloud metadata update notifications.
    pub cloud_batching_ms: u64,
    /// Path of the durable sync-state file.
    pub state_file: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Optional path to a log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root: default_data_dir().join("documents"),
            accepted_extension: "kml".to_string(),
            debounce_ms: 200,
            cloud_batching_ms: 1_000,
            state_file: default_data_dir().join("sync-state.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ubisync")
}

/// A single configuration validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `sync.debounce_ms`.
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ubisync")
            .join("config.yaml")
    }

    /// Validate the configuration, returning every problem found.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.sync.root.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "sync.root".to_string(),
                message: "documents root must not be empty".to_string(),
            });
        }
        if self.sync.accepted_extension.is_empty() {
            errors.push(ValidationError {
                field: "sync.accepted_extension".to_string(),
                message: "accepted extension must not be empty".to_string(),
            });
        }
        if self.sync.accepted_extension.starts_with('.') {
            errors.push(ValidationError {
                field: "sync.accepted_extension".to_string(),
                message: "extension is given without the leading dot".to_string(),
            });
        }
        if self.sync.debounce_ms == 0 {
            errors.push(ValidationError {
                field: "sync.debounce_ms".to_string(),
                message: "debounce window must be positive".to_string(),
            });
        }
        if self.sync.cloud_batching_ms == 0 {
            errors.push(ValidationError {
                field: "sync.cloud_batching_ms".to_string(),
                message: "batching interval must be positive".to_string(),
            });
        }

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".to_string(),
                message: format!("unknown log level '{}'", self.logging.level),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.sync.debounce_ms, 200);
        assert_eq!(config.sync.cloud_batching_ms, 1_000);
        assert_eq!(config.sync.accepted_extension, "kml");
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "sync:\n  root: /home/user/Documents\n  accepted_extension: kml\n  \
             debounce_ms: 250\n  cloud_batching_ms: 1500\n  state_file: /tmp/state.json\n\
             logging:\n  level: debug\n  file: null\n"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.sync.root, PathBuf::from("/home/user/Documents"));
        assert_eq!(config.sync.debounce_ms, 250);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(config.sync.debounce_ms, 200);
    }

    #[test]
    fn test_validate_flags_problems() {
        let mut config = Config::default();
        config.sync.accepted_extension = ".kml".to_string();
        config.sync.debounce_ms = 0;
        config.logging.level = "chatty".to_string();

        let errors = config.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"sync.accepted_extension"));
        assert!(fields.contains(&"sync.debounce_ms"));
        assert!(fields.contains(&"logging.level"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError {
            field: "sync.root".to_string(),
            message: "must not be empty".to_string(),
        };
        assert_eq!(err.to_string(), "sync.root: must not be empty");
    }
}
