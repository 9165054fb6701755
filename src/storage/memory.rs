//! In-memory run history.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::RunLog;
use crate::storage::{RunLogStore, newest_first};

/// Process-local run history. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryRunLogStore {
    logs: Mutex<Vec<RunLog>>,
}

impl MemoryRunLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all endpoints.
    pub async fn len(&self) -> usize {
        self.logs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.logs.lock().await.is_empty()
    }
}

#[async_trait]
impl RunLogStore for MemoryRunLogStore {
    async fn append(&self, log: RunLog) -> Result<RunLog> {
        self.logs.lock().await.push(log.clone());
        Ok(log)
    }

    async fn list_for_endpoint(
        &self,
        endpoint_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RunLog>> {
        Ok(newest_first(&self.logs.lock().await, endpoint_id, limit))
    }

    async fn delete(&self, log_id: &str) -> Result<bool> {
        let mut logs = self.logs.lock().await;
        let before = logs.len();
        logs.retain(|log| log.id != log_id);
        Ok(logs.len() != before)
    }
}
