//! Logger error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a [`Logger`](crate::Logger) from being built.
///
/// Runtime write and rotation failures are not represented here; they are
/// reported through `tracing` and never reach the caller of a log method.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("create log directory {path} failed: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("open log file {path} failed: {source}")]
    OpenFile { path: PathBuf, source: io::Error },

    #[error("get file stats for {path} failed: {source}")]
    Stat { path: PathBuf, source: io::Error },

    #[error("spawn {name} thread failed: {source}")]
    Spawn { name: &'static str, source: io::Error },

    #[error("read config {path} failed: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("parse config failed: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LoggerError>;
