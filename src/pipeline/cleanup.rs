// src/pipeline/cleanup.rs

//! Retention sweep: retires snapshots older than each endpoint's window.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::error::{AppError, Result};
use crate::models::{CleanupSummary, Endpoint};
use crate::pipeline::snapshot::snapshot_files;
use crate::storage::{EndpointSource, RunLogStore};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Deletes expired snapshot files and the run logs that point at them.
pub struct CleanupSweeper {
    endpoints: Arc<dyn EndpointSource>,
    logs: Arc<dyn RunLogStore>,
    data_dir: PathBuf,
}

impl CleanupSweeper {
    pub fn new(
        endpoints: Arc<dyn EndpointSource>,
        logs: Arc<dyn RunLogStore>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            endpoints,
            logs,
            data_dir: data_dir.into(),
        }
    }

    /// Sweep every endpoint that has a retention window.
    pub async fn sweep(&self) -> CleanupSummary {
        self.sweep_at(SystemTime::now()).await
    }

    /// Sweep as if the current time were `now`.
    pub async fn sweep_at(&self, now: SystemTime) -> CleanupSummary {
        let mut total = CleanupSummary::default();

        let endpoints = match self.endpoints.list().await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                log::error!("Cleanup could not load endpoints: {}", e);
                total.errors += 1;
                return total;
            }
        };

        for endpoint in endpoints.iter().filter(|e| e.retention_days().is_some()) {
            match self.sweep_endpoint(endpoint, now).await {
                Ok(summary) => {
                    if summary.deleted > 0 {
                        log::info!(
                            "Cleanup: deleted {} old file(s) for endpoint \"{}\"",
                            summary.deleted,
                            endpoint.name
                        );
                    }
                    total.merge(summary);
                }
                Err(e) => {
                    log::error!("Cleanup error for endpoint \"{}\": {}", endpoint.name, e);
                    total.errors += 1;
                }
            }
        }

        if total.deleted > 0 || total.errors > 0 {
            log::info!(
                "Cleanup completed: {} file(s) deleted, {} error(s)",
                total.deleted,
                total.errors
            );
        }
        total
    }

    /// Sweep one endpoint's output directory.
    pub async fn sweep_endpoint(&self, endpoint: &Endpoint, now: SystemTime) -> Result<CleanupSummary> {
        let mut summary = CleanupSummary::default();
        let Some(days) = endpoint.retention_days() else {
            return Ok(summary);
        };

        let dir = endpoint.save_dir(&self.data_dir);
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(summary);
        }

        let cutoff = now
            .checked_sub(Duration::from_secs(u64::from(days) * SECS_PER_DAY))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        for path in snapshot_files(&dir, &endpoint.file_stem()).await? {
            match retire(&path, cutoff).await {
                Ok(false) => {}
                Ok(true) => {
                    summary.deleted += 1;
                    if let Err(e) = self.forget(endpoint, &path).await {
                        log::warn!("Could not remove run log for {}: {}", path.display(), e);
                        summary.errors += 1;
                    }
                }
                Err(e) => {
                    log::warn!("Could not process file {}: {}", path.display(), e);
                    summary.errors += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Drop the run log that references `path`, if any.
    async fn forget(&self, endpoint: &Endpoint, path: &Path) -> Result<()> {
        if let Some(log) = self.logs.find_by_path(&endpoint.id, path).await? {
            self.logs.delete(&log.id).await?;
        }
        Ok(())
    }
}

/// Delete `path` if it was last modified strictly before `cutoff`.
async fn retire(path: &Path, cutoff: SystemTime) -> Result<bool> {
    let modified = tokio::fs::metadata(path)
        .await
        .and_then(|meta| meta.modified())
        .map_err(|e| AppError::cleanup(path, e))?;

    if modified >= cutoff {
        return Ok(false);
    }

    tokio::fs::remove_file(path)
        .await
        .map_err(|e| AppError::cleanup(path, e))?;
    log::debug!("Deleted expired snapshot {}", path.display());
    Ok(true)
}
