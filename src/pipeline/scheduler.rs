// src/pipeline/scheduler.rs

//! Periodic triggers for endpoint jobs and the retention sweep.
//!
//! Each endpoint gets its own trigger task that sleeps until the next cron
//! occurrence and then spawns the job on a separate task, so a slow or
//! failing job never delays another trigger. `stop()` cancels the triggers
//! only; jobs already running are left to finish.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Local};
use cron::Schedule;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::Result;
use crate::models::Endpoint;
use crate::pipeline::cleanup::CleanupSweeper;
use crate::pipeline::runner::JobRunner;
use crate::storage::EndpointSource;
use crate::utils::schedule::parse_schedule;

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// A live trigger task.
struct Trigger {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Trigger {
    fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }

    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

struct Triggers {
    state: SchedulerState,
    endpoints: HashMap<String, Trigger>,
    cleanup: Option<Trigger>,
}

impl Triggers {
    fn clear(&mut self) {
        for (_, trigger) in self.endpoints.drain() {
            trigger.stop();
        }
        if let Some(trigger) = self.cleanup.take() {
            trigger.stop();
        }
        self.state = SchedulerState::Stopped;
    }
}

/// Owns one trigger per endpoint plus the daily cleanup trigger.
pub struct Scheduler {
    endpoints: Arc<dyn EndpointSource>,
    runner: Arc<JobRunner>,
    sweeper: Arc<CleanupSweeper>,
    cleanup_schedule: String,
    jobs: TaskTracker,
    triggers: Mutex<Triggers>,
}

impl Scheduler {
    pub fn new(
        endpoints: Arc<dyn EndpointSource>,
        runner: Arc<JobRunner>,
        sweeper: Arc<CleanupSweeper>,
        cleanup_schedule: impl Into<String>,
    ) -> Self {
        Self {
            endpoints,
            runner,
            sweeper,
            cleanup_schedule: cleanup_schedule.into(),
            jobs: TaskTracker::new(),
            triggers: Mutex::new(Triggers {
                state: SchedulerState::Stopped,
                endpoints: HashMap::new(),
                cleanup: None,
            }),
        }
    }

    /// (Re)start scheduling with the current endpoint set.
    ///
    /// Any existing triggers are torn down first. Endpoints with an invalid
    /// schedule are skipped with a warning. Returns the number of endpoint
    /// triggers created.
    pub async fn start(&self) -> Result<usize> {
        let mut triggers = self.triggers.lock().await;
        triggers.clear();

        let cleanup_schedule = parse_schedule(&self.cleanup_schedule)?;
        let endpoints = self.endpoints.list().await?;

        for endpoint in endpoints {
            let schedule = match parse_schedule(&endpoint.schedule) {
                Ok(schedule) => schedule,
                Err(e) => {
                    log::warn!("Failed to schedule {} ({}): {}", endpoint.name, endpoint.id, e);
                    continue;
                }
            };
            if triggers.endpoints.contains_key(&endpoint.id) {
                log::warn!("Duplicate endpoint id {}, keeping the first", endpoint.id);
                continue;
            }
            let id = endpoint.id.clone();
            let trigger = self.endpoint_trigger(endpoint, schedule);
            triggers.endpoints.insert(id, trigger);
        }

        triggers.cleanup = Some(self.cleanup_trigger(cleanup_schedule));
        triggers.state = SchedulerState::Running;

        let count = triggers.endpoints.len();
        log::info!("Scheduler started with {} endpoint jobs and cleanup job", count);
        Ok(count)
    }

    /// Halt and discard all triggers.
    pub async fn stop(&self) {
        let mut triggers = self.triggers.lock().await;
        if triggers.state == SchedulerState::Running {
            log::info!("Scheduler stopping");
        }
        triggers.clear();
    }

    pub async fn state(&self) -> SchedulerState {
        self.triggers.lock().await.state
    }

    /// Number of trigger tasks still alive, cleanup included.
    pub async fn pending_triggers(&self) -> usize {
        let triggers = self.triggers.lock().await;
        triggers.endpoints.values().filter(|t| t.is_pending()).count()
            + triggers.cleanup.iter().filter(|t| t.is_pending()).count()
    }

    /// Wait for jobs that are already running to finish.
    pub async fn wait_for_jobs(&self) {
        self.jobs.close();
        self.jobs.wait().await;
        self.jobs.reopen();
    }

    fn endpoint_trigger(&self, endpoint: Endpoint, schedule: Schedule) -> Trigger {
        let runner = Arc::clone(&self.runner);
        let endpoint = Arc::new(endpoint);
        let label = format!("endpoint {}", endpoint.id);

        self.spawn_trigger(label, schedule, move || {
            let runner = Arc::clone(&runner);
            let endpoint = Arc::clone(&endpoint);
            async move {
                log::info!("Running job for {} ({})", endpoint.name, endpoint.id);
                let result = runner.run_job(&endpoint).await;
                if let Some(error) = result.error {
                    log::warn!("Scheduled job for {} failed: {}", endpoint.id, error);
                }
            }
        })
    }

    fn cleanup_trigger(&self, schedule: Schedule) -> Trigger {
        let sweeper = Arc::clone(&self.sweeper);

        self.spawn_trigger("cleanup".to_string(), schedule, move || {
            let sweeper = Arc::clone(&sweeper);
            async move {
                log::info!("Running cleanup job for old files...");
                sweeper.sweep().await;
            }
        })
    }

    fn spawn_trigger<F, Fut>(&self, label: String, schedule: Schedule, fire: F) -> Trigger
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let jobs = self.jobs.clone();

        let handle = tokio::spawn(async move {
            let mut last_fire: Option<DateTime<Local>> = None;
            loop {
                let now = Local::now();
                let from = match last_fire {
                    Some(last) if last > now => last,
                    _ => now,
                };
                let Some(next) = schedule.after(&from).next() else {
                    log::debug!("Trigger {label} has no further occurrences");
                    break;
                };
                let wait = (next - now).to_std().unwrap_or_default();

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {
                        last_fire = Some(next);
                        jobs.spawn(fire());
                    }
                }
            }
        });

        Trigger { cancel, handle }
    }
}
