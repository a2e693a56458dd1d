//! Logger configuration.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{LoggerError, Result};
use crate::level::Level;

/// What happens after an `Error` entry has been written.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalAction {
    /// `Error` is an ordinary level.
    #[default]
    Continue,
    /// Sync the log file and exit the process with `code`, which must be
    /// non-zero.
    Exit { code: i32 },
    /// Call the hook with the plain file line once the write has been
    /// attempted. A failed write does not suppress the call.
    #[serde(skip)]
    Callback(Arc<dyn Fn(&str) + Send + Sync>),
}

impl TerminalAction {
    /// Wraps a closure as a [`TerminalAction::Callback`].
    pub fn callback(hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        TerminalAction::Callback(Arc::new(hook))
    }
}

impl fmt::Debug for TerminalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalAction::Continue => f.write_str("Continue"),
            TerminalAction::Exit { code } => f.debug_struct("Exit").field("code", code).finish(),
            TerminalAction::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Construction-time settings of a [`Logger`](crate::Logger).
///
/// The logger keeps its own copy, so changing a config after the logger is
/// built has no effect on it.
///
/// # Examples
///
/// ```
/// # use rotating_logger::{LogConfig, Level};
/// # use std::time::Duration;
/// let config = LogConfig::new("logs/main.log")
///     .with_max_size(10 * 1024 * 1024)
///     .with_queue_capacity(1000)
///     .with_flush_interval(Duration::from_secs(5))
///     .with_console_levels([Level::Warn, Level::Error]);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Path of the active log file. Archives are created next to it.
    pub file_path: PathBuf,
    /// Size threshold that triggers rotation.
    pub max_size_bytes: u64,
    /// Entries the queue holds before callers fall back to direct writes.
    pub queue_capacity: usize,
    /// Period of the background flush. Zero disables it.
    #[serde(rename = "flush_interval_ms", deserialize_with = "duration_ms::deserialize")]
    pub flush_interval: Duration,
    /// Levels mirrored to standard error. `Trace` is always mirrored.
    pub console_levels: BTreeSet<Level>,
    /// Suppress console mirroring entirely.
    pub file_only: bool,
    /// Do not open a log file; entries only reach the console.
    pub console_only: bool,
    /// Color the console header.
    pub color_output: bool,
    /// Name written in the first header bracket.
    pub app_name: String,
    pub terminal_action: TerminalAction,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from(DEFAULT_FILE),
            max_size_bytes: DEFAULT_MAX_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            console_levels: BTreeSet::from([Level::Warn, Level::Error]),
            file_only: false,
            console_only: false,
            color_output: false,
            app_name: DEFAULT_APP_NAME.to_string(),
            terminal_action: TerminalAction::Continue,
        }
    }
}

impl LogConfig {
    /// Default settings writing to `file_path`.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: LogConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoggerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Rejects settings the logger cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_size_bytes == 0 {
            return Err(LoggerError::InvalidConfig("max_size_bytes must be positive".into()));
        }
        if self.queue_capacity == 0 {
            return Err(LoggerError::InvalidConfig("queue_capacity must be positive".into()));
        }
        if self.file_only && self.console_only {
            return Err(LoggerError::InvalidConfig(
                "file_only and console_only are mutually exclusive".into(),
            ));
        }
        if let TerminalAction::Exit { code: 0 } = self.terminal_action {
            return Err(LoggerError::InvalidConfig(
                "terminal exit code must be non-zero".into(),
            ));
        }
        if !self.console_only && self.file_path.as_os_str().is_empty() {
            return Err(LoggerError::InvalidConfig("file_path is empty".into()));
        }
        Ok(())
    }

    /// Whether entries at `level` are written to standard error.
    pub fn mirrors_to_console(&self, level: Level) -> bool {
        !self.file_only && (level.is_raw() || self.console_levels.contains(&level))
    }

    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_console_levels(mut self, levels: impl IntoIterator<Item = Level>) -> Self {
        self.console_levels = levels.into_iter().collect();
        self
    }

    pub fn with_file_only(mut self, file_only: bool) -> Self {
        self.file_only = file_only;
        self
    }

    pub fn with_console_only(mut self, console_only: bool) -> Self {
        self.console_only = console_only;
        self
    }

    pub fn with_color(mut self, color_output: bool) -> Self {
        self.color_output = color_output;
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_terminal_action(mut self, action: TerminalAction) -> Self {
        self.terminal_action = action;
        self
    }
}

const DEFAULT_FILE: &str = "main.log";
const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const DEFAULT_QUEUE_CAPACITY: usize = 1000;
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_APP_NAME: &str = "APP";

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
