//! Snapshot pipeline.
//!
//! - `runner`: one job run, fetch → snapshot → diff → run log
//! - `scheduler`: cron triggers for endpoint jobs and the retention sweep
//! - `cleanup`: deletes snapshots past their retention window

pub mod cleanup;
pub mod diff;
pub mod runner;
pub mod scheduler;
pub mod snapshot;
pub mod tabular;

pub use cleanup::CleanupSweeper;
pub use runner::JobRunner;
pub use scheduler::{Scheduler, SchedulerState};
pub use snapshot::{write_structured, write_tabular};
