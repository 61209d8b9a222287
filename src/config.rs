//! Context configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logging status value that turns the sink on.
pub const LOGGING_ENABLED: &str = "enabled";

/// Environment name that pins the invocation id to [`DEV_INVOCATION_ID`].
pub const DEVELOPMENT_ENV: &str = "development";

/// Invocation id used in development environments.
pub const DEV_INVOCATION_ID: &str = "dev";

/// Configuration shared by every invocation handled by an [`crate::Invoker`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Logging status. Empty or `"enabled"` turns logging on.
    pub logging: String,
    /// Deployment environment name.
    pub environment: String,
    /// Directory holding per-invocation log files.
    pub log_dir: PathBuf,
    /// Whether stdout/stderr written by functions is captured into the sink.
    pub capture_native: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            logging: LOGGING_ENABLED.to_string(),
            environment: "production".to_string(),
            log_dir: PathBuf::from("/mnt/logs"),
            capture_native: true,
        }
    }
}

impl ContextConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from `FEZZ_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(logging) = lookup("FEZZ_LOGGING") {
            config.logging = logging;
        }
        if let Some(environment) = lookup("FEZZ_ENV") {
            config.environment = environment;
        }
        if let Some(dir) = lookup("FEZZ_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(capture) = lookup("FEZZ_CAPTURE_NATIVE") {
            config.capture_native = !matches!(capture.as_str(), "0" | "false" | "disabled");
        }
        config
    }

    /// Set the logging status.
    pub fn logging(mut self, status: impl Into<String>) -> Self {
        self.logging = status.into();
        self
    }

    /// Set the environment name.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Set the log directory.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Enable or disable native stream capture.
    pub fn capture_native(mut self, capture: bool) -> Self {
        self.capture_native = capture;
        self
    }

    /// Whether the environment is a development one.
    pub fn is_development(&self) -> bool {
        self.environment == DEVELOPMENT_ENV
    }
}
