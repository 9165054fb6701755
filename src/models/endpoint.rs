//! Endpoint definitions consumed by the scheduler and job runner.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::utils::{normalize_name, resolve_path};
use crate::utils::schedule::parse_schedule;

/// Serialization format of a snapshot file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Record-preserving JSON
    #[default]
    #[serde(alias = "structured")]
    Json,
    /// Flattened rows and columns
    #[serde(alias = "tabular")]
    Csv,
}

impl OutputFormat {
    /// File extension used for snapshots in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

/// A remote HTTP resource polled on a schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Endpoint {
    /// Immutable identity
    pub id: String,

    /// Display name; its normalized form prefixes every snapshot file
    pub name: String,

    /// Target URL
    pub url: String,

    /// HTTP method
    #[serde(default = "defaults::method")]
    pub method: String,

    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Cron-style schedule expression
    #[serde(default = "defaults::schedule")]
    pub schedule: String,

    /// Snapshot serialization format
    #[serde(default)]
    pub format: OutputFormat,

    /// Output directory (falls back to the configured data directory)
    #[serde(default)]
    pub save_path: Option<PathBuf>,

    /// Retention window in days
    #[serde(default)]
    pub max_file_age_days: Option<u32>,

    /// Log a change event whenever a run detects new content
    #[serde(default)]
    pub notify_on_change: bool,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Endpoint {
    /// Create an endpoint with default method, schedule, and format.
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            method: defaults::method(),
            headers: BTreeMap::new(),
            schedule: defaults::schedule(),
            format: OutputFormat::default(),
            save_path: None,
            max_file_age_days: None,
            notify_on_change: false,
            created_at: Utc::now(),
        }
    }

    /// Filesystem-safe token used as the snapshot file prefix.
    pub fn file_stem(&self) -> String {
        normalize_name(&self.name)
    }

    /// Directory this endpoint's snapshots are written to.
    pub fn save_dir(&self, default_dir: &Path) -> PathBuf {
        match &self.save_path {
            Some(path) if !path.as_os_str().is_empty() => path.clone(),
            _ => default_dir.to_path_buf(),
        }
    }

    /// Anchor a relative `save_path` at `base`, the directory of the file
    /// that defined this endpoint.
    pub fn anchor_save_path(&mut self, base: &Path) {
        if let Some(path) = self.save_path.as_mut().filter(|p| !p.as_os_str().is_empty()) {
            *path = resolve_path(base, path);
        }
    }

    /// Retention window, if a positive one is configured.
    pub fn retention_days(&self) -> Option<u32> {
        self.max_file_age_days.filter(|days| *days > 0)
    }

    /// Validate the endpoint definition.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::validation("endpoint id is empty"));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::validation(format!(
                "endpoint {} has an empty name",
                self.id
            )));
        }
        Url::parse(&self.url)?;
        reqwest::Method::from_bytes(self.method.to_uppercase().as_bytes()).map_err(|_| {
            AppError::validation(format!(
                "endpoint {} has invalid HTTP method '{}'",
                self.id, self.method
            ))
        })?;
        parse_schedule(&self.schedule)?;
        if self.max_file_age_days == Some(0) {
            return Err(AppError::validation(format!(
                "endpoint {}: max_file_age_days must be > 0 when set",
                self.id
            )));
        }
        Ok(())
    }
}

mod defaults {
    pub fn method() -> String {
        "GET".into()
    }
    pub fn schedule() -> String {
        "*/5 * * * *".into()
    }
}
