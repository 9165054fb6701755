//! End-to-end scenarios against the file-backed stores.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use snapshotter::Snapshotter;
use snapshotter::models::{Config, Endpoint, RunLog, RunStatus};
use snapshotter::pipeline::SchedulerState;
use snapshotter::storage::{JsonRunLogStore, RunLogStore, StaticEndpointSource};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOUR: Duration = Duration::from_secs(60 * 60);

fn config(root: &Path) -> Config {
    let mut config = Config::default();
    config.paths.data_dir = root.join("data");
    config.paths.run_log_file = root.join("data/runs.json");
    config.fetch.timeout_secs = 1;
    config
}

async fn service(root: &Path, endpoints: Vec<Endpoint>) -> (Snapshotter, Arc<JsonRunLogStore>) {
    let config = config(root);
    let logs = Arc::new(
        JsonRunLogStore::open(&config.paths.run_log_file)
            .await
            .unwrap(),
    );
    let app = Snapshotter::with_stores(
        config,
        Arc::new(StaticEndpointSource::new(endpoints)),
        logs.clone(),
    )
    .unwrap();
    (app, logs)
}

fn age(path: &Path, by: Duration) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - by).unwrap();
}

#[tokio::test]
async fn first_run_is_flagged_and_identical_rerun_is_not() {
    let tmp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"btc":1,"eth":2}"#))
        .mount(&server)
        .await;

    let endpoint = Endpoint::new("prices", "Prices", format!("{}/prices", server.uri()));
    let (app, _) = service(tmp.path(), vec![endpoint]).await;

    let first = app.run_now("prices").await.unwrap();
    assert!(first.ok);
    assert_eq!(first.log.status, RunStatus::Success);
    assert!(first.log.diff_detected);

    let second = app.run_now("prices").await.unwrap();
    assert!(second.ok);
    assert!(!second.log.diff_detected);
    assert_ne!(first.log.file_path, second.log.file_path);
}

#[tokio::test]
async fn run_history_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1,2,3]"))
        .mount(&server)
        .await;
    let endpoint = Endpoint::new("nums", "Numbers", server.uri());

    {
        let (app, _) = service(tmp.path(), vec![endpoint.clone()]).await;
        app.run_now("nums").await.unwrap();
    }

    let (app, _) = service(tmp.path(), vec![endpoint]).await;
    let second = app.run_now("nums").await.unwrap();
    assert!(!second.log.diff_detected);
    assert_eq!(app.history("nums", None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn retention_sweep_removes_expired_files_and_their_logs() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("feeds");
    std::fs::create_dir_all(&out).unwrap();

    let mut endpoint = Endpoint::new("feed", "Feed", "https://example.com/feed");
    endpoint.save_path = Some(out.clone());
    endpoint.max_file_age_days = Some(1);

    let expired = out.join("feed-2026-01-01T00-00-00-000000Z.json");
    let recent = out.join("feed-2026-01-03T00-00-00-000000Z.json");
    std::fs::write(&expired, b"{}").unwrap();
    std::fs::write(&recent, b"{}").unwrap();
    age(&expired, HOUR * 48);
    age(&recent, HOUR);

    let (app, logs) = service(tmp.path(), vec![endpoint]).await;
    logs.append(RunLog::success("feed", expired.clone(), true))
        .await
        .unwrap();
    logs.append(RunLog::success("feed", recent.clone(), false))
        .await
        .unwrap();

    let summary = app.cleanup().await;
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.errors, 0);
    assert!(!expired.exists());
    assert!(recent.exists());

    let remaining = logs.list_for_endpoint("feed", None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].file_path.as_deref(), Some(recent.as_path()));

    let again = app.cleanup().await;
    assert_eq!(again.deleted, 0);
}

#[tokio::test]
async fn fetch_timeout_records_error_without_file() {
    let tmp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let endpoint = Endpoint::new("slow", "Slow", server.uri());
    let (app, logs) = service(tmp.path(), vec![endpoint]).await;

    let result = app.run_now("slow").await.unwrap();
    assert!(!result.ok);
    assert!(result.error.is_some());

    let history = logs.list_for_endpoint("slow", None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, RunStatus::Error);
    assert!(
        history[0]
            .error_message
            .as_deref()
            .is_some_and(|m| !m.is_empty())
    );
    assert!(app.files("slow").await.unwrap().is_empty());
}

#[tokio::test]
async fn start_then_stop_leaves_no_pending_triggers() {
    let tmp = TempDir::new().unwrap();
    let endpoints = (0..5)
        .map(|i| {
            let mut endpoint = Endpoint::new(format!("e{i}"), format!("E {i}"), "https://example.com");
            endpoint.schedule = format!("{i} * * * *");
            endpoint
        })
        .collect();
    let (app, _) = service(tmp.path(), endpoints).await;

    assert_eq!(app.scheduler().start().await.unwrap(), 5);
    app.scheduler().stop().await;

    assert_eq!(app.scheduler().pending_triggers().await, 0);
    assert_eq!(app.scheduler().state().await, SchedulerState::Stopped);
}
