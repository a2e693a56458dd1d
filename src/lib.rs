//! # Rotating Logger
//!
//! An in-process asynchronous log writer that rotates its file by size:
//!
//! * **Non-blocking logging**: entries go through a bounded queue; when it is
//!   full the caller writes the entry itself instead of waiting
//! * **Size-based rotation**: the active file is archived as
//!   `<path>.<unix-nanos>` once the next line would take it past the limit
//! * **Graceful shutdown**: `close` drains the queue before releasing the file
//!
//! ## Key Features
//!
//! * One consumer thread formats and writes entries in queue order
//! * Concurrent rotation requests are coalesced, at most one runs at a time
//! * Console mirroring to stderr per level, with optional color
//! * Periodic background flush
//! * Configurable action for `Error` entries (continue, exit, or a callback)
//!
//! ## Main Components
//!
//! * `Logger`: queue, consumer and flush timer in front of the file
//! * `RotatingWriter`: the file handle, its size and the rotation logic
//! * `Formatter`: turns an `Entry` into a console line and a file line
//! * `archive`: lists rotated files and reads lines back across them
//!
//! ## Quick Start
//!
//! ```
//! use rotating_logger::{Logger, LogConfig, Level, log_info, log_warn};
//! use std::time::Duration;
//!
//! # let dir = tempfile::tempdir().unwrap();
//! let config = LogConfig::new(dir.path().join("main.log"))
//!     .with_max_size(10 * 1024 * 1024)
//!     .with_queue_capacity(1000)
//!     .with_flush_interval(Duration::from_secs(5))
//!     .with_console_levels([Level::Warn, Level::Error]);
//! let logger = Logger::new(config).unwrap();
//!
//! logger.banner("---------- startup ----------");
//! log_info!(logger, "Temperature: {} C", 25.5);
//! log_warn!(logger, "Status: {}, Count: {}", true, 42);
//!
//! logger.close();
//! ```

pub mod archive;
pub mod bridge;
pub mod config;
pub mod entry;
pub mod error;
pub mod formatter;
pub mod global;
pub mod level;
pub mod loggable;
pub mod logger;
pub mod rotating_writer;

pub use config::{LogConfig, TerminalAction};
pub use entry::Entry;
pub use error::{LoggerError, Result};
pub use formatter::{FormattedEntry, Formatter};
pub use level::Level;
pub use loggable::Loggable;
pub use logger::{LifecycleState, Logger};
pub use rotating_writer::RotatingWriter;
