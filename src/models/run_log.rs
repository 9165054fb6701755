//! Run history records.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one job execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

/// Durable record of one job execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunLog {
    pub id: String,

    /// Owning endpoint identity
    pub endpoint_id: String,

    pub status: RunStatus,

    /// Snapshot written by this run (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    pub run_time: DateTime<Utc>,

    /// Whether content differs from the previous snapshot
    #[serde(default)]
    pub diff_detected: bool,

    /// Failure message (error only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RunLog {
    /// Record of a run that produced a snapshot.
    pub fn success(endpoint_id: impl Into<String>, file_path: PathBuf, diff_detected: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            endpoint_id: endpoint_id.into(),
            status: RunStatus::Success,
            file_path: Some(file_path),
            run_time: Utc::now(),
            diff_detected,
            error_message: None,
        }
    }

    /// Record of a failed run.
    pub fn failure(endpoint_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            endpoint_id: endpoint_id.into(),
            status: RunStatus::Error,
            file_path: None,
            run_time: Utc::now(),
            diff_detected: false,
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Result handed back to callers of a job run. Never an `Err`.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub ok: bool,
    pub log: RunLog,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResult {
    pub fn from_log(log: RunLog) -> Self {
        Self {
            ok: log.is_success(),
            error: log.error_message.clone(),
            log,
        }
    }
}

/// A snapshot file on disk, joined with the run that wrote it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotFile {
    pub path: PathBuf,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_detected: Option<bool>,
}

/// Aggregate counts from one retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub deleted: usize,
    pub errors: usize,
}

impl CleanupSummary {
    pub fn merge(&mut self, other: CleanupSummary) {
        self.deleted += other.deleted;
        self.errors += other.errors;
    }
}
