//! Utility functions and helpers.

pub mod http;
pub mod schedule;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"));

/// Normalize an endpoint name into a filesystem-safe token.
///
/// Lowercases the name and collapses every run of non-alphanumeric
/// characters into a single underscore.
pub fn normalize_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let token = NON_ALNUM.replace_all(&lower, "_");
    let token = token.trim_matches('_');
    if token.is_empty() {
        "endpoint".to_string()
    } else {
        token.to_string()
    }
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// ISO 8601 timestamp with `:` and `.` replaced by `-`.
///
/// Fixed width, so lexicographic order equals chronological order.
pub fn snapshot_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S-%6fZ").to_string()
}
