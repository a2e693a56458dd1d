//! Adapter that routes the `log` crate's macros into a [`Logger`].

use std::sync::Arc;

use crate::entry::Entry;
use crate::level::Level;
use crate::logger::Logger;

/// `log::Log` implementation over a shared [`Logger`].
///
/// `log::Level::Trace` maps to [`Level::Debug`]: this crate's `Trace` is a
/// raw, header-less passthrough and is not a verbosity level.
pub struct LogBridge {
    logger: Arc<Logger>,
    max_level: log::LevelFilter,
}

impl LogBridge {
    pub fn new(logger: Arc<Logger>, max_level: log::LevelFilter) -> Self {
        Self { logger, max_level }
    }
}

/// Maps a `log` level onto the level this crate writes.
pub fn map_level(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warn,
        log::Level::Info => Level::Info,
        log::Level::Debug | log::Level::Trace => Level::Debug,
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        self.logger
            .submit(Entry::from_parts(map_level(record.level()), None, vec![message]));
    }

    fn flush(&self) {
        self.logger.flush();
    }
}

/// Installs a [`LogBridge`] as the `log` crate's global logger.
///
/// Fails if another `log` implementation is already installed.
pub fn init_log_bridge(
    logger: Arc<Logger>,
    max_level: log::LevelFilter,
) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(logger, max_level)))?;
    log::set_max_level(max_level);
    Ok(())
}
