//! Endpoint definition sources.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::Endpoint;
use crate::storage::EndpointSource;

/// Shape of the endpoints TOML file.
#[derive(Debug, Default, Deserialize)]
struct EndpointsFile {
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

/// Endpoints defined in a TOML file with `[[endpoints]]` tables.
///
/// The file is read on every `list()`, so restarting the scheduler picks up
/// edits without restarting the process.
#[derive(Debug, Clone)]
pub struct TomlEndpointSource {
    path: PathBuf,
}

impl TomlEndpointSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse endpoint definitions from TOML text.
    pub fn parse(content: &str) -> Result<Vec<Endpoint>> {
        let file: EndpointsFile = toml::from_str(content)?;

        let mut seen = std::collections::HashSet::new();
        for endpoint in &file.endpoints {
            if !seen.insert(endpoint.id.as_str()) {
                return Err(AppError::config(format!(
                    "duplicate endpoint id '{}'",
                    endpoint.id
                )));
            }
        }
        Ok(file.endpoints)
    }

    /// Parse endpoint definitions, anchoring relative `save_path`s at `base`.
    pub fn parse_relative_to(content: &str, base: &Path) -> Result<Vec<Endpoint>> {
        let mut endpoints = Self::parse(content)?;
        for endpoint in &mut endpoints {
            endpoint.anchor_save_path(base);
        }
        Ok(endpoints)
    }
}

#[async_trait]
impl EndpointSource for TomlEndpointSource {
    async fn list(&self) -> Result<Vec<Endpoint>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let base = self.path.parent().unwrap_or_else(|| Path::new(""));
                Self::parse_relative_to(&content, base)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("No endpoints file at {}", self.path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// In-memory endpoint set that can be swapped at runtime.
#[derive(Debug, Default)]
pub struct StaticEndpointSource {
    endpoints: RwLock<Vec<Endpoint>>,
}

impl StaticEndpointSource {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints: RwLock::new(endpoints),
        }
    }

    /// Replace the whole endpoint set.
    pub async fn replace(&self, endpoints: Vec<Endpoint>) {
        *self.endpoints.write().await = endpoints;
    }
}

#[async_trait]
impl EndpointSource for StaticEndpointSource {
    async fn list(&self) -> Result<Vec<Endpoint>> {
        Ok(self.endpoints.read().await.clone())
    }
}
