// src/pipeline/runner.rs

//! Job runner: fetch → snapshot → diff → run log.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::Result;
use crate::models::{Config, Endpoint, OutputFormat, RunLog, RunResult};
use crate::pipeline::diff;
use crate::pipeline::snapshot::{write_structured, write_tabular};
use crate::storage::RunLogStore;
use crate::utils::http::{create_async_client, fetch_payload};

/// Executes one capture of an endpoint and records its outcome.
pub struct JobRunner {
    client: reqwest::Client,
    logs: Arc<dyn RunLogStore>,
    data_dir: PathBuf,
    timeout: Duration,
    /// Serializes runs of the same endpoint
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl JobRunner {
    /// Create a runner from the application configuration.
    pub fn new(config: &Config, logs: Arc<dyn RunLogStore>) -> Result<Self> {
        Ok(Self {
            client: create_async_client(&config.fetch)?,
            logs,
            data_dir: config.paths.data_dir.clone(),
            timeout: Duration::from_secs(config.fetch.timeout_secs),
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Run one job for `endpoint`.
    ///
    /// Always yields exactly one run-log record; failures are reported in
    /// the result, never returned as errors.
    pub async fn run_job(&self, endpoint: &Endpoint) -> RunResult {
        let lock = self.endpoint_lock(&endpoint.id);
        let _guard = lock.lock().await;

        let log = match self.capture(endpoint).await {
            Ok(path) => {
                let changed = self.detect_change(endpoint, &path).await;
                if changed && endpoint.notify_on_change {
                    log::info!(
                        "Change detected for {} ({}): {}",
                        endpoint.name,
                        endpoint.id,
                        path.display()
                    );
                }
                log::debug!("Snapshot for {} written to {}", endpoint.id, path.display());
                RunLog::success(&endpoint.id, path, changed)
            }
            Err(e) => {
                log::warn!("Job for {} ({}) failed: {}", endpoint.name, endpoint.id, e);
                RunLog::failure(&endpoint.id, e.to_string())
            }
        };

        RunResult::from_log(self.record(log).await)
    }

    fn endpoint_lock(&self, endpoint_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(endpoint_id.to_string()).or_default())
    }

    /// Fetch and persist a snapshot, returning its path.
    async fn capture(&self, endpoint: &Endpoint) -> Result<PathBuf> {
        let payload = fetch_payload(&self.client, endpoint, self.timeout).await?;

        let dir = endpoint.save_dir(&self.data_dir);
        let base_name = endpoint.file_stem();

        match endpoint.format {
            OutputFormat::Json => write_structured(&dir, &base_name, &payload).await,
            OutputFormat::Csv => match write_tabular(&dir, &base_name, &payload).await {
                Ok(path) => Ok(path),
                Err(e) => {
                    log::warn!(
                        "CSV export failed for {}, falling back to JSON: {}",
                        endpoint.name,
                        e
                    );
                    write_structured(&dir, &base_name, &payload).await
                }
            },
        }
    }

    /// Compare the new snapshot against the latest recorded one.
    async fn detect_change(&self, endpoint: &Endpoint, current: &Path) -> bool {
        let previous = match self.logs.latest_with_file(&endpoint.id).await {
            Ok(previous) => previous.and_then(|log| log.file_path),
            Err(e) => {
                log::warn!("Could not read run history for {}: {}", endpoint.id, e);
                None
            }
        };

        diff::file_changed(previous.as_deref(), current)
            .await
            .unwrap_or_else(|e| {
                log::warn!("Change detection failed for {}: {}", endpoint.id, e);
                true
            })
    }

    async fn record(&self, log: RunLog) -> RunLog {
        match self.logs.append(log.clone()).await {
            Ok(stored) => stored,
            Err(e) => {
                log::error!("Failed to persist run log for {}: {}", log.endpoint_id, e);
                log
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunStatus;
    use crate::storage::MemoryRunLogStore;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn runner(data_dir: &Path) -> (JobRunner, Arc<MemoryRunLogStore>) {
        let mut config = Config::default();
        config.paths.data_dir = data_dir.to_path_buf();
        let store = Arc::new(MemoryRunLogStore::new());
        let runner = JobRunner::new(&config, store.clone()).unwrap();
        (runner, store)
    }

    async fn serve(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_csv_endpoint_writes_csv() {
        let tmp = TempDir::new().unwrap();
        let server = serve(r#"{"data":[{"id":1},{"id":2}]}"#).await;
        let (runner, _) = runner(tmp.path());

        let mut endpoint = Endpoint::new("ep", "Rows", server.uri());
        endpoint.format = OutputFormat::Csv;

        let result = runner.run_job(&endpoint).await;
        assert!(result.ok);
        let path = result.log.file_path.unwrap();
        assert!(path.extension().is_some_and(|e| e == "csv"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "id\n1\n2\n");
    }

    #[tokio::test]
    async fn test_csv_falls_back_to_json_for_scalar_payload() {
        let tmp = TempDir::new().unwrap();
        let server = serve("just text").await;
        let (runner, _) = runner(tmp.path());

        let mut endpoint = Endpoint::new("ep", "Text", server.uri());
        endpoint.format = OutputFormat::Csv;

        let result = runner.run_job(&endpoint).await;
        assert!(result.ok);
        let path = result.log.file_path.unwrap();
        assert!(path.extension().is_some_and(|e| e == "json"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "\"just text\"");
    }

    #[tokio::test]
    async fn test_save_path_overrides_data_dir() {
        let tmp = TempDir::new().unwrap();
        let server = serve("[]").await;
        let (runner, _) = runner(&tmp.path().join("default"));

        let mut endpoint = Endpoint::new("ep", "Custom Dir", server.uri());
        endpoint.save_path = Some(tmp.path().join("custom"));

        let result = runner.run_job(&endpoint).await;
        let path = result.log.file_path.unwrap();
        assert_eq!(path.parent(), Some(tmp.path().join("custom").as_path()));
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("custom_dir-")
        );
    }

    #[tokio::test]
    async fn test_changed_content_is_detected() {
        let tmp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[1]"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[2]"))
            .mount(&server)
            .await;
        let (runner, store) = runner(tmp.path());
        let endpoint = Endpoint::new("ep", "Counter", server.uri());

        assert!(runner.run_job(&endpoint).await.log.diff_detected);
        assert!(runner.run_job(&endpoint).await.log.diff_detected);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_missing_previous_file_counts_as_changed() {
        let tmp = TempDir::new().unwrap();
        let server = serve(r#"{"a":1}"#).await;
        let (runner, _) = runner(tmp.path());
        let endpoint = Endpoint::new("ep", "Feed", server.uri());

        let first = runner.run_job(&endpoint).await;
        std::fs::remove_file(first.log.file_path.unwrap()).unwrap();

        let second = runner.run_job(&endpoint).await;
        assert!(second.ok);
        assert!(second.log.diff_detected);
    }

    #[tokio::test]
    async fn test_http_error_is_recorded() {
        let tmp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let (runner, store) = runner(tmp.path());
        let endpoint = Endpoint::new("ep", "Missing", server.uri());

        let result = runner.run_job(&endpoint).await;
        assert!(!result.ok);
        assert_eq!(result.log.status, RunStatus::Error);
        assert!(result.error.unwrap().contains("404"));

        let logs = store.list_for_endpoint("ep", None).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].file_path.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_runs_of_one_endpoint_are_serialized() {
        let tmp = TempDir::new().unwrap();
        let server = serve(r#"{"same":true}"#).await;
        let (runner, store) = runner(tmp.path());
        let runner = Arc::new(runner);
        let endpoint = Endpoint::new("ep", "Same", server.uri());

        let runs: Vec<_> = (0..4)
            .map(|_| {
                let runner = Arc::clone(&runner);
                let endpoint = endpoint.clone();
                tokio::spawn(async move { runner.run_job(&endpoint).await })
            })
            .collect();
        for run in futures::future::join_all(runs).await {
            assert!(run.unwrap().ok);
        }

        let logs = store.list_for_endpoint("ep", None).await.unwrap();
        assert_eq!(logs.len(), 4);
        assert_eq!(logs.iter().filter(|l| l.diff_detected).count(), 1);
    }
}
