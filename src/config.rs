// src/config.rs

//! Configuration loading utilities.
//!
//! Relative paths inside the config file are resolved against the directory
//! that holds it, so the service behaves the same from any working directory.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{Config, Endpoint};
use crate::storage::TomlEndpointSource;
use crate::utils::resolve_path;

/// Load configuration from a TOML file and apply environment overrides.
///
/// A missing file falls back to defaults; a file that exists but does not
/// parse is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path)?
    } else {
        log::warn!("Config file {} not found. Using defaults.", path.display());
        Config::default()
    };
    config.apply_env_overrides();

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    config.paths.data_dir = resolve_path(base, &config.paths.data_dir);
    config.paths.run_log_file = resolve_path(base, &config.paths.run_log_file);
    config.paths.endpoints_file = resolve_path(base, &config.paths.endpoints_file);
    Ok(config)
}

/// Load and validate the endpoint definitions named by `config`.
///
/// Every invalid endpoint is reported, not just the first one.
pub fn load_endpoints(config: &Config) -> Result<Vec<Endpoint>> {
    let path = &config.paths.endpoints_file;
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::config(format!("Cannot read {}: {}", path.display(), e)))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let endpoints = TomlEndpointSource::parse_relative_to(&content, base)?;

    let problems: Vec<String> = endpoints
        .iter()
        .filter_map(|endpoint| {
            endpoint
                .validate()
                .err()
                .map(|e| format!("{}: {}", endpoint.id, e))
        })
        .collect();
    if !problems.is_empty() {
        return Err(AppError::validation(problems.join("; ")));
    }
    Ok(endpoints)
}

/// Load and validate both config and endpoint definitions.
pub fn load_all(config_path: &Path) -> Result<(Config, Vec<Endpoint>)> {
    let config = load_config(config_path)?;
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid config: {e}")))?;
    let endpoints = load_endpoints(&config)?;
    Ok((config, endpoints))
}
