// src/error.rs

//! Unified error handling for the snapshot service.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Result type alias for snapshot operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Schedule expression could not be parsed
    #[error("Invalid schedule '{expression}': {message}")]
    ScheduleParse { expression: String, message: String },

    /// Request to an endpoint failed (timeout, connection, non-2xx)
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Snapshot could not be serialized or written
    #[error("Write error at {path}: {message}")]
    Write { path: String, message: String },

    /// A file could not be retired during cleanup
    #[error("Cleanup error at {path}: {message}")]
    Cleanup { path: String, message: String },

    /// A job ran but recorded a failure
    #[error("Run failed for {endpoint}: {message}")]
    Run { endpoint: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a schedule parsing error.
    pub fn schedule(expression: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ScheduleParse {
            expression: expression.into(),
            message: message.to_string(),
        }
    }

    /// Create a fetch error for the given URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an error for a failed run of `endpoint`.
    pub fn run(endpoint: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Run {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Create a write error for the given path.
    pub fn write(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::Write {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a cleanup error for the given path.
    pub fn cleanup(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::Cleanup {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_carries_url_and_cause() {
        let err = AppError::fetch("https://example.com/a", "operation timed out");
        assert_eq!(
            err.to_string(),
            "Fetch error for https://example.com/a: operation timed out"
        );
    }

    #[test]
    fn test_run_error_keeps_the_recorded_message() {
        let err = AppError::run("Weather", "Write error at /data/w.json: disk full");
        assert_eq!(
            err.to_string(),
            "Run failed for Weather: Write error at /data/w.json: disk full"
        );
    }

    #[test]
    fn test_write_error_displays_path() {
        let err = AppError::write(Path::new("/tmp/out.csv"), "disk full");
        assert!(err.to_string().contains("/tmp/out.csv"));
        assert!(err.to_string().contains("disk full"));
    }
}
