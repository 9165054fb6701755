//! Local filesystem run history.
//!
//! Keeps every record in a single JSON array file. The whole array is held
//! in memory and the file is rewritten atomically after each change.
//!
//! ## Storage Layout
//!
//! ```text
//! {data_dir}/
//! ├── runs.json                               # Run history (all endpoints)
//! └── {endpoint}-{timestamp}.{json|csv}       # Snapshots
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::RunLog;
use crate::storage::{RunLogStore, newest_first};

/// JSON-file backed run history.
#[derive(Debug)]
pub struct JsonRunLogStore {
    path: PathBuf,
    logs: Mutex<Vec<RunLog>>,
}

impl JsonRunLogStore {
    /// Open the store at `path`, loading existing records if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let logs = match read_bytes(&path).await? {
            Some(bytes) if !bytes.is_empty() => serde_json::from_slice(&bytes)?,
            _ => Vec::new(),
        };
        log::debug!("Loaded {} run records from {}", logs.len(), path.display());
        Ok(Self {
            path,
            logs: Mutex::new(logs),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, logs: &[RunLog]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(logs)?;
        write_bytes(&self.path, &bytes).await
    }
}

#[async_trait]
impl RunLogStore for JsonRunLogStore {
    async fn append(&self, log: RunLog) -> Result<RunLog> {
        let mut logs = self.logs.lock().await;
        logs.push(log.clone());
        if let Err(e) = self.persist(&logs).await {
            logs.pop();
            return Err(e);
        }
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
        let Some(index) = logs.iter().position(|log| log.id == log_id) else {
            return Ok(false);
        };
        let removed = logs.remove(index);
        if let Err(e) = self.persist(&logs).await {
            logs.insert(index, removed);
            return Err(e);
        }
        Ok(true)
    }
}

/// Read bytes, returning None if the file doesn't exist.
async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Write bytes atomically (write to temp, then rename).
async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
