// src/app.rs

//! Service assembly: wires storage, runner, sweeper and scheduler together.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{CleanupSummary, Config, Endpoint, RunLog, RunResult, SnapshotFile};
use crate::pipeline::snapshot::snapshot_files;
use crate::pipeline::{CleanupSweeper, JobRunner, Scheduler};
use crate::storage::{EndpointSource, JsonRunLogStore, RunLogStore, TomlEndpointSource};

/// A fully wired snapshot service.
pub struct Snapshotter {
    config: Config,
    endpoints: Arc<dyn EndpointSource>,
    logs: Arc<dyn RunLogStore>,
    runner: Arc<JobRunner>,
    sweeper: Arc<CleanupSweeper>,
    scheduler: Scheduler,
}

impl Snapshotter {
    /// Build the service on top of the file-backed stores named by `config`.
    pub async fn open(config: Config) -> Result<Self> {
        let endpoints = Arc::new(TomlEndpointSource::new(&config.paths.endpoints_file));
        let logs = Arc::new(JsonRunLogStore::open(&config.paths.run_log_file).await?);
        Self::with_stores(config, endpoints, logs)
    }

    /// Build the service on top of caller-provided stores.
    pub fn with_stores(
        config: Config,
        endpoints: Arc<dyn EndpointSource>,
        logs: Arc<dyn RunLogStore>,
    ) -> Result<Self> {
        let runner = Arc::new(JobRunner::new(&config, Arc::clone(&logs))?);
        let sweeper = Arc::new(CleanupSweeper::new(
            Arc::clone(&endpoints),
            Arc::clone(&logs),
            &config.paths.data_dir,
        ));
        let scheduler = Scheduler::new(
            Arc::clone(&endpoints),
            Arc::clone(&runner),
            Arc::clone(&sweeper),
            config.scheduler.cleanup_schedule.clone(),
        );

        Ok(Self {
            config,
            endpoints,
            logs,
            runner,
            sweeper,
            scheduler,
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Look up an endpoint by id.
    pub async fn endpoint(&self, id: &str) -> Result<Endpoint> {
        self.endpoints
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::config(format!("Unknown endpoint '{id}'")))
    }

    /// Run one job for the endpoint with the given id.
    pub async fn run_now(&self, id: &str) -> Result<RunResult> {
        let endpoint = self.endpoint(id).await?;
        Ok(self.runner.run_job(&endpoint).await)
    }

    /// Run one job for every endpoint concurrently.
    pub async fn run_all(&self) -> Result<Vec<(Endpoint, RunResult)>> {
        let endpoints = self.endpoints.list().await?;
        let runs = endpoints.iter().map(|endpoint| self.runner.run_job(endpoint));
        let results = futures::future::join_all(runs).await;
        Ok(endpoints.into_iter().zip(results).collect())
    }

    pub async fn cleanup(&self) -> CleanupSummary {
        self.sweeper.sweep().await
    }

    /// Run history for an endpoint, newest first.
    pub async fn history(&self, id: &str, limit: Option<usize>) -> Result<Vec<RunLog>> {
        self.logs.list_for_endpoint(id, limit).await
    }

    /// Snapshot files currently on disk for an endpoint, oldest first,
    /// each joined with the run that wrote it when that run is still logged.
    pub async fn files(&self, id: &str) -> Result<Vec<SnapshotFile>> {
        let endpoint = self.endpoint(id).await?;
        let dir = endpoint.save_dir(&self.config.paths.data_dir);
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let runs: HashMap<PathBuf, RunLog> = self
            .logs
            .list_for_endpoint(id, None)
            .await?
            .into_iter()
            .filter_map(|log| log.file_path.clone().map(|path| (path, log)))
            .collect();

        let mut files = Vec::new();
        for path in snapshot_files(&dir, &endpoint.file_stem()).await? {
            let size = match tokio::fs::metadata(&path).await {
                Ok(meta) => meta.len(),
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let run = runs.get(&path);
            files.push(SnapshotFile {
                size,
                run_time: run.map(|log| log.run_time),
                diff_detected: run.map(|log| log.diff_detected),
                path,
            });
        }
        Ok(files)
    }
}
