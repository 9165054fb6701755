//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::schedule::parse_schedule;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP fetch behavior settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply `SNAPSHOTTER_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("SNAPSHOTTER_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            self.paths.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup("SNAPSHOTTER_RUN_LOG").filter(|v| !v.trim().is_empty()) {
            self.paths.run_log_file = PathBuf::from(file);
        }
        if let Some(level) = lookup("SNAPSHOTTER_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.logging.level = level;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        parse_schedule(&self.scheduler.cleanup_schedule)?;
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Output directory for endpoints without their own `save_path`
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,

    /// JSON file holding the run history
    #[serde(default = "defaults::run_log_file")]
    pub run_log_file: PathBuf,

    /// TOML file with `[[endpoints]]` definitions
    #[serde(default = "defaults::endpoints_file")]
    pub endpoints_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            run_log_file: defaults::run_log_file(),
            endpoints_file: defaults::endpoints_file(),
        }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// When the retention sweep runs (local time)
    #[serde(default = "defaults::cleanup_schedule")]
    pub cleanup_schedule: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cleanup_schedule: defaults::cleanup_schedule(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn user_agent() -> String {
        concat!("snapshotter/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }

    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn run_log_file() -> PathBuf {
        PathBuf::from("data/runs.json")
    }
    pub fn endpoints_file() -> PathBuf {
        PathBuf::from("endpoints.toml")
    }

    pub fn cleanup_schedule() -> String {
        "0 2 * * *".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.fetch.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.fetch.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_cleanup_schedule() {
        let mut config = Config::default();
        config.scheduler.cleanup_schedule = "every night".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::ScheduleParse { .. })
        ));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [paths]
            data_dir = "/var/lib/snapshots"
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("/var/lib/snapshots"));
        assert_eq!(config.paths.run_log_file, PathBuf::from("data/runs.json"));
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.scheduler.cleanup_schedule, "0 2 * * *");
    }

    #[test]
    fn env_overrides_replace_paths_and_level() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "SNAPSHOTTER_DATA_DIR" => Some("/srv/data".to_string()),
            "SNAPSHOTTER_LOG_LEVEL" => Some("debug".to_string()),
            "SNAPSHOTTER_RUN_LOG" => Some(" ".to_string()),
            _ => None,
        });
        assert_eq!(config.paths.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.paths.run_log_file, PathBuf::from("data/runs.json"));
    }
}
