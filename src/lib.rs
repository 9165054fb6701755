// src/lib.rs

//! Snapshotter Library
//!
//! Polls HTTP endpoints on cron schedules, keeps every response as a
//! timestamped JSON or CSV file, flags content changes between runs and
//! retires old files per endpoint.

pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod utils;

pub use app::Snapshotter;
