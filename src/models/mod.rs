// src/models/mod.rs

//! Domain models for the snapshot service.

mod config;
mod endpoint;
mod run_log;

// Re-export all public types
pub use config::{Config, FetchConfig, LoggingConfig, PathsConfig, SchedulerConfig};
pub use endpoint::{Endpoint, OutputFormat};
pub use run_log::{CleanupSummary, RunLog, RunResult, RunStatus, SnapshotFile};
