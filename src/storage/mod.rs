//! Storage abstractions for run history and endpoint definitions.
//!
//! - `RunLogStore`: append-only run history, one record per job execution
//! - `EndpointSource`: read access to the externally owned endpoint set
//!
//! ## Backends
//!
//! ```text
//! JsonRunLogStore      # runs.json, rewritten atomically on every change
//! MemoryRunLogStore    # process-local, for tests and ad-hoc runs
//! TomlEndpointSource   # endpoints.toml, re-read on every list()
//! StaticEndpointSource # in-memory, replaceable set
//! ```

pub mod endpoints;
pub mod local;
pub mod memory;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Endpoint, RunLog};

// Re-export for convenience
pub use endpoints::{StaticEndpointSource, TomlEndpointSource};
pub use local::JsonRunLogStore;
pub use memory::MemoryRunLogStore;

/// Trait for run history backends. Implementations must accept concurrent appends.
#[async_trait]
pub trait RunLogStore: Send + Sync {
    /// Persist a new record and return it.
    async fn append(&self, log: RunLog) -> Result<RunLog>;

    /// Records for an endpoint, newest run first.
    async fn list_for_endpoint(&self, endpoint_id: &str, limit: Option<usize>)
    -> Result<Vec<RunLog>>;

    /// Delete a record by id. Returns whether it existed.
    async fn delete(&self, log_id: &str) -> Result<bool>;

    /// Most recent record for the endpoint that references a snapshot file.
    async fn latest_with_file(&self, endpoint_id: &str) -> Result<Option<RunLog>> {
        Ok(self
            .list_for_endpoint(endpoint_id, None)
            .await?
            .into_iter()
            .find(|log| log.file_path.is_some()))
    }

    /// Record of this endpoint that references exactly `path`.
    async fn find_by_path(&self, endpoint_id: &str, path: &Path) -> Result<Option<RunLog>> {
        Ok(self
            .list_for_endpoint(endpoint_id, None)
            .await?
            .into_iter()
            .find(|log| log.file_path.as_deref() == Some(path)))
    }
}

/// Read access to endpoint definitions owned by the management layer.
#[async_trait]
pub trait EndpointSource: Send + Sync {
    /// Current endpoint set.
    async fn list(&self) -> Result<Vec<Endpoint>>;

    /// Look up one endpoint by identity.
    async fn get_by_id(&self, id: &str) -> Result<Option<Endpoint>> {
        Ok(self.list().await?.into_iter().find(|e| e.id == id))
    }
}

/// Newest-first view of one endpoint's records.
///
/// Records with equal run times keep reverse insertion order.
pub(crate) fn newest_first(logs: &[RunLog], endpoint_id: &str, limit: Option<usize>) -> Vec<RunLog> {
    let mut selected: Vec<RunLog> = logs
        .iter()
        .rev()
        .filter(|log| log.endpoint_id == endpoint_id)
        .cloned()
        .collect();
    selected.sort_by(|a, b| b.run_time.cmp(&a.run_time));
    if let Some(limit) = limit {
        selected.truncate(limit);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::path::PathBuf;

    #[test]
    fn test_newest_first_orders_and_limits() {
        let now = Utc::now();
        let mut old = RunLog::success("a", PathBuf::from("a-1.json"), true);
        old.run_time = now - Duration::minutes(10);
        let mut new = RunLog::success("a", PathBuf::from("a-2.json"), false);
        new.run_time = now;
        let other = RunLog::failure("b", "boom");

        let logs = vec![new.clone(), old.clone(), other];
        let view = newest_first(&logs, "a", None);
        assert_eq!(view, vec![new.clone(), old]);

        let limited = newest_first(&logs, "a", Some(1));
        assert_eq!(limited, vec![new]);
    }

    #[test]
    fn test_newest_first_breaks_ties_by_insertion() {
        let first = RunLog::failure("a", "first");
        let mut second = RunLog::failure("a", "second");
        second.run_time = first.run_time;

        let view = newest_first(&[first, second], "a", None);
        assert_eq!(view[0].error_message.as_deref(), Some("second"));
    }
}
