//! Logging configuration.
//!
//! The effective filter is picked from, in order: `GIT_LFS_LOG`,
//! `RUST_LOG`, the level set on [`LogConfig`], then `warn`.

use std::str::FromStr;
use thiserror::Error;

/// Environment variable with the highest filter precedence
pub const LOG_ENV_VAR: &str = "GIT_LFS_LOG";

/// Filter used when nothing else is configured
pub const DEFAULT_LEVEL: &str = "warn";

/// Errors that can occur during logging setup
#[derive(Error, Debug)]
pub enum LogError {
    /// Unknown output format name
    #[error("Unknown log format: {0}. Expected one of: pretty, compact, json")]
    InvalidFormat(String),

    /// Filter directive could not be parsed
    #[error("Failed to parse log filter '{filter}': {reason}")]
    InvalidFilter {
        /// The directive string
        filter: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber is already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Output format for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human-readable
    Pretty,

    /// Single-line
    #[default]
    Compact,

    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, LogError> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(LogError::InvalidFormat(s.to_string())),
        }
    }
}

/// Configuration for logging; output always goes to stderr
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format
    pub format: LogFormat,

    /// Filter directive (e.g. `debug`, `lfs_git=trace`), below the
    /// environment variables in precedence
    pub level: Option<String>,

    /// ANSI colours
    pub use_color: bool,

    /// Timestamps on each event
    pub use_timestamps: bool,

    /// Module path of each event
    pub include_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Compact,
            level: None,
            use_color: true,
            use_timestamps: false,
            include_targets: true,
        }
    }
}

impl LogConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Enable or disable color output
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    /// Enable or disable timestamps
    pub fn with_timestamps(mut self, use_timestamps: bool) -> Self {
        self.use_timestamps = use_timestamps;
        self
    }

    /// Enable or disable target module names
    pub fn with_targets(mut self, include_targets: bool) -> Self {
        self.include_targets = include_targets;
        self
    }

    /// The filter directive to install, reading the process environment
    pub fn effective_filter(&self) -> String {
        self.effective_filter_with(|name| std::env::var(name).ok())
    }

    /// The filter directive to install, reading variables through `env`
    pub fn effective_filter_with<F>(&self, env: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        [LOG_ENV_VAR, "RUST_LOG"]
            .into_iter()
            .filter_map(&env)
            .find(|value| !value.trim().is_empty())
            .or_else(|| self.level.clone())
            .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("COMPACT".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("Json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_default_filter_is_warn() {
        let config = LogConfig::new();
        assert_eq!(config.effective_filter_with(env_of(&[])), "warn");
    }

    #[test]
    fn test_configured_level_used_without_env() {
        let config = LogConfig::new().with_level("debug");
        assert_eq!(config.effective_filter_with(env_of(&[])), "debug");
    }

    #[test]
    fn test_env_precedence() {
        let config = LogConfig::new().with_level("debug");
        assert_eq!(
            config.effective_filter_with(env_of(&[("RUST_LOG", "info")])),
            "info"
        );
        assert_eq!(
            config.effective_filter_with(env_of(&[
                ("RUST_LOG", "info"),
                ("GIT_LFS_LOG", "lfs_git=trace")
            ])),
            "lfs_git=trace"
        );
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let config = LogConfig::new().with_level("error");
        assert_eq!(
            config.effective_filter_with(env_of(&[("GIT_LFS_LOG", " ")])),
            "error"
        );
    }
}
