//! Optional process-wide default logger.
//!
//! Nothing in the crate reads this slot on its own: components that log take
//! a `Logger` handle. The default exists for code paths where threading a
//! handle through is impractical (signal handlers, panic hooks, the `log`
//! facade bridge).
//!
//! # Thread Safety
//!
//! The slot is guarded by a read-write lock. Reading the default clones an
//! `Arc`, so the lock is never held while logging.

use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::logger::Logger;

lazy_static! {
    static ref DEFAULT_LOGGER: RwLock<Option<Arc<Logger>>> = RwLock::new(None);
}

/// Installs `logger` as the default and returns the previous one, if any.
///
/// # Examples
///
/// ```
/// # use rotating_logger::{global, Logger, LogConfig};
/// # use std::sync::Arc;
/// # let dir = tempfile::tempdir().unwrap();
/// let logger = Arc::new(Logger::new(LogConfig::new(dir.path().join("main.log"))).unwrap());
/// global::set_default(Arc::clone(&logger));
///
/// if let Some(default) = global::default_logger() {
///     default.info(&[&"from anywhere"]);
/// }
/// # global::take_default();
/// ```
pub fn set_default(logger: Arc<Logger>) -> Option<Arc<Logger>> {
    DEFAULT_LOGGER.write().replace(logger)
}

/// The current default logger.
pub fn default_logger() -> Option<Arc<Logger>> {
    DEFAULT_LOGGER.read().clone()
}

/// Removes the default so it can be closed by its last owner.
pub fn take_default() -> Option<Arc<Logger>> {
    DEFAULT_LOGGER.write().take()
}

/// Flushes and closes the default logger, leaving the slot empty.
pub fn shutdown_default() {
    if let Some(logger) = take_default() {
        logger.flush();
        logger.close();
    }
}
