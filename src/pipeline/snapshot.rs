// src/pipeline/snapshot.rs

//! Snapshot writer.
//!
//! Every snapshot is a new file named `{base}-{timestamp}.{ext}` inside the
//! endpoint's output directory. Files are created with `create_new`, so an
//! existing snapshot is never overwritten.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::OutputFormat;
use crate::pipeline::tabular::{self, Table};
use crate::utils::snapshot_timestamp;

const MAX_NAME_ATTEMPTS: usize = 5;

/// File name for a snapshot taken at `at`.
pub fn snapshot_file_name(base_name: &str, at: DateTime<Utc>, format: OutputFormat) -> String {
    format!(
        "{}-{}.{}",
        base_name,
        snapshot_timestamp(at),
        format.extension()
    )
}

/// Write `payload` as pretty-printed JSON.
pub async fn write_structured(dir: &Path, base_name: &str, payload: &Value) -> Result<PathBuf> {
    let bytes = serde_json::to_vec_pretty(payload).map_err(|e| AppError::write(dir, e))?;
    write_snapshot(dir, base_name, OutputFormat::Json, &bytes).await
}

/// Coerce `payload` into records and write them as CSV.
///
/// An empty record sequence produces an empty file.
pub async fn write_tabular(dir: &Path, base_name: &str, payload: &Value) -> Result<PathBuf> {
    let records = tabular::coerce(payload)
        .into_records()
        .ok_or_else(|| AppError::write(dir, "payload has no tabular shape"))?;
    let csv = Table::from_records(&records).to_csv();
    write_snapshot(dir, base_name, OutputFormat::Csv, csv.as_bytes()).await
}

async fn write_snapshot(
    dir: &Path,
    base_name: &str,
    format: OutputFormat,
    bytes: &[u8],
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::write(dir, e))?;

    let (path, mut file) = create_unique(dir, base_name, format).await?;

    let written = async {
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        let _ = tokio::fs::remove_file(&path).await;
        return Err(AppError::write(&path, e));
    }

    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

/// Reserve a fresh timestamped file name.
async fn create_unique(
    dir: &Path,
    base_name: &str,
    format: OutputFormat,
) -> Result<(PathBuf, tokio::fs::File)> {
    let mut last_error = None;
    for _ in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(snapshot_file_name(base_name, Utc::now(), format));
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                last_error = Some(AppError::write(&path, e));
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            }
            Err(e) => return Err(AppError::write(&path, e)),
        }
    }
    Err(last_error.unwrap_or_else(|| AppError::write(dir, "could not reserve a snapshot name")))
}

/// Whether `file_name` is a snapshot of the endpoint whose normalized name is `stem`.
///
/// Attribution is by prefix only: `{stem}-` or `{stem}_`, case-insensitive.
pub fn belongs_to(file_name: &str, stem: &str) -> bool {
    let lower = file_name.to_lowercase();
    let stem = stem.to_lowercase();
    lower
        .strip_prefix(&stem)
        .is_some_and(|rest| rest.starts_with('-') || rest.starts_with('_'))
}

/// Snapshot files in `dir` belonging to `stem`, oldest first.
pub async fn snapshot_files(dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !belongs_to(name, stem) {
            continue;
        }
        let path = entry.path();
        if is_regular_file(&path, entry.file_type().await) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Whether a listed entry is a regular file.
///
/// An entry that cannot be inspected (typically deleted since the
/// directory was read) is skipped.
fn is_regular_file(path: &Path, file_type: std::io::Result<std::fs::FileType>) -> bool {
    match file_type {
        Ok(file_type) => file_type.is_file(),
        Err(e) => {
            log::warn!("Skipping {}: {}", path.display(), e);
            false
        }
    }
}
