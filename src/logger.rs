use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::config::{LogConfig, TerminalAction};
use crate::entry::Entry;
use crate::error::{LoggerError, Result};
use crate::formatter::Formatter;
use crate::level::Level;
use crate::loggable::Loggable;
use crate::rotating_writer::RotatingWriter;

/// How long `flush` sleeps between checks of the queue.
const FLUSH_POLL: Duration = Duration::from_millis(5);

/// Where a logger is in its shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Accepting entries into the queue.
    Active,
    /// `close` has started; new entries are written directly.
    ShuttingDown,
    /// Threads are stopped and the file is released.
    Closed,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Active,
            1 => LifecycleState::ShuttingDown,
            _ => LifecycleState::Closed,
        }
    }
}

/// Asynchronous front end of the rotating log.
///
/// The Logger owns a bounded queue, one consumer thread that drains it, an
/// optional flush timer thread, and the [`RotatingWriter`] the consumer
/// writes into:
///
/// 1. `log`/`logf` build an [`Entry`] and try to enqueue it
/// 2. The consumer formats each entry, mirrors it to stderr if its level is
///    enabled, and appends the plain line to the file
/// 3. `close` stops the threads, writes whatever is still queued and
///    releases the file
///
/// # Backpressure
///
/// Logging never blocks. When the queue is full the entry is formatted and
/// written on the caller's thread instead. Such an entry can land in the file
/// before entries that were queued earlier: entries that went through the
/// queue keep their order among themselves, but there is no total order
/// between queued and directly written entries.
///
/// # Thread Safety
///
/// Logger is `Send + Sync`. Share it behind an `Arc` (or pass `&Logger`) to
/// every component that logs; there is no hidden global instance. See
/// [`crate::global`] for an optional process-wide default.
///
/// # Examples
///
/// ```
/// # use rotating_logger::{Logger, LogConfig, Level, log_info};
/// # let dir = tempfile::tempdir().unwrap();
/// let logger = Logger::new(LogConfig::new(dir.path().join("main.log"))).unwrap();
///
/// logger.info(&[&"service started"]);
/// logger.logf(Level::Warn, "retrying in {} ms", &[&250]);
/// log_info!(logger, "queue depth {}", 3);
///
/// logger.flush();
/// logger.close();
/// ```
pub struct Logger {
    shared: Arc<Shared>,
    sender: Sender<Entry>,
    receiver: Receiver<Entry>,
    shutdown: Mutex<Option<Sender<()>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// State used by both the calling threads and the worker threads.
struct Shared {
    config: LogConfig,
    formatter: Formatter,
    writer: Option<RotatingWriter>,
    /// Entries enqueued but not yet written.
    pending: AtomicUsize,
    consumer_running: AtomicBool,
    state: AtomicU8,
    fallback_writes: AtomicU64,
}

impl Logger {
    /// Validates `config`, opens the log file and starts the worker threads.
    ///
    /// Fails if the directory or file cannot be created, or a thread cannot
    /// be spawned. No thread is left running on failure.
    pub fn new(config: LogConfig) -> Result<Self> {
        config.validate()?;

        let writer = if config.console_only {
            None
        } else {
            Some(RotatingWriter::open(&config.file_path, config.max_size_bytes)?)
        };

        let (sender, receiver) = bounded(config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let flush_interval = config.flush_interval;

        let shared = Arc::new(Shared {
            formatter: Formatter::from_config(&config),
            config,
            writer,
            pending: AtomicUsize::new(0),
            consumer_running: AtomicBool::new(true),
            state: AtomicU8::new(LifecycleState::Active as u8),
            fallback_writes: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(2);
        {
            let shared = Arc::clone(&shared);
            let entries = receiver.clone();
            let shutdown = shutdown_rx.clone();
            let handle = thread::Builder::new()
                .name("rotating-logger-consumer".into())
                .spawn(move || run_consumer(shared, entries, shutdown))
                .map_err(|source| LoggerError::Spawn {
                    name: "consumer",
                    source,
                })?;
            workers.push(handle);
        }

        if !flush_interval.is_zero() {
            let shared_timer = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name("rotating-logger-flush".into())
                .spawn(move || run_flush_timer(shared_timer, flush_interval, shutdown_rx));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    // Stop the consumer we already started.
                    drop(shutdown_tx);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(LoggerError::Spawn {
                        name: "flush timer",
                        source,
                    });
                }
            }
        }

        tracing::debug!(
            path = %shared.config.file_path.display(),
            queue_capacity = shared.config.queue_capacity,
            max_size_bytes = shared.config.max_size_bytes,
            "logger started"
        );

        Ok(Self {
            shared,
            sender,
            receiver,
            shutdown: Mutex::new(Some(shutdown_tx)),
            workers: Mutex::new(workers),
        })
    }

    /// Logs the arguments joined by spaces.
    pub fn log(&self, level: Level, args: &[&dyn Loggable]) {
        self.submit(Entry::new(level, args));
    }

    /// Logs `template` with each `{}` replaced by the next argument.
    pub fn logf(&self, level: Level, template: &str, args: &[&dyn Loggable]) {
        self.submit(Entry::with_template(level, template, args));
    }

    /// Queues a prebuilt entry.
    ///
    /// If the queue is full, or the logger is shutting down, the entry is
    /// written synchronously on the calling thread instead.
    pub fn submit(&self, entry: Entry) {
        if self.state() != LifecycleState::Active {
            self.shared.write_direct(&entry);
            return;
        }

        // Count first so the consumer can never decrement below zero.
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        match self.sender.try_send(entry) {
            Ok(()) => {
                // `close` may have finished its final drain between the
                // state check and the send. Deliver what is left here.
                if self.shared.state.load(Ordering::SeqCst) != LifecycleState::Active as u8 {
                    while let Ok(entry) = self.receiver.try_recv() {
                        self.shared.write_queued(&entry);
                    }
                }
            }
            Err(TrySendError::Full(entry)) | Err(TrySendError::Disconnected(entry)) => {
                self.shared.pending.fetch_sub(1, Ordering::AcqRel);
                self.shared.write_direct(&entry);
            }
        }
    }

    /// Writes a raw line with no header, e.g. a startup separator.
    pub fn banner(&self, text: &str) {
        self.log(Level::Trace, &[&text]);
    }

    pub fn trace(&self, args: &[&dyn Loggable]) {
        self.log(Level::Trace, args);
    }

    pub fn info(&self, args: &[&dyn Loggable]) {
        self.log(Level::Info, args);
    }

    pub fn debug(&self, args: &[&dyn Loggable]) {
        self.log(Level::Debug, args);
    }

    pub fn warn(&self, args: &[&dyn Loggable]) {
        self.log(Level::Warn, args);
    }

    pub fn error(&self, args: &[&dyn Loggable]) {
        self.log(Level::Error, args);
    }

    pub fn tracef(&self, template: &str, args: &[&dyn Loggable]) {
        self.logf(Level::Trace, template, args);
    }

    pub fn infof(&self, template: &str, args: &[&dyn Loggable]) {
        self.logf(Level::Info, template, args);
    }

    pub fn debugf(&self, template: &str, args: &[&dyn Loggable]) {
        self.logf(Level::Debug, template, args);
    }

    pub fn warnf(&self, template: &str, args: &[&dyn Loggable]) {
        self.logf(Level::Warn, template, args);
    }

    pub fn errorf(&self, template: &str, args: &[&dyn Loggable]) {
        self.logf(Level::Error, template, args);
    }

    /// Blocks until every queued entry has been written, then syncs the file.
    ///
    /// This is a best-effort barrier: entries queued by other threads while
    /// `flush` waits may or may not be included. It returns early if the
    /// consumer has stopped, since `close` takes over draining then.
    pub fn flush(&self) {
        self.shared.flush();
    }

    /// Stops the logger and releases the log file.
    ///
    /// Signals shutdown, waits for the consumer and the flush timer to exit,
    /// writes any entries still queued, then closes the file. Every entry
    /// logged before `close` was called is in the file when it returns.
    ///
    /// Call it once. A second call returns immediately. It must not be called
    /// from a terminal action callback, which runs on the consumer thread.
    pub fn close(&self) {
        let started = self.shared.state.compare_exchange(
            LifecycleState::Active as u8,
            LifecycleState::ShuttingDown as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if started.is_err() {
            return;
        }

        // Dropping the only sender wakes every thread selecting on it.
        drop(self.shutdown.lock().take());
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                tracing::error!("logger worker thread panicked");
            }
        }

        // Entries that slipped in after the consumer's final drain.
        while let Ok(entry) = self.receiver.try_recv() {
            self.shared.write_queued(&entry);
        }

        if let Some(writer) = &self.shared.writer {
            if let Err(e) = writer.close() {
                tracing::warn!(error = %e, "closing log file failed");
            }
        }
        self.shared
            .state
            .store(LifecycleState::Closed as u8, Ordering::Release);
        tracing::debug!("logger closed");
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    pub fn config(&self) -> &LogConfig {
        &self.shared.config
    }

    /// The file writer, absent in console-only mode.
    pub fn writer(&self) -> Option<&RotatingWriter> {
        self.shared.writer.as_ref()
    }

    /// Number of entries that bypassed the queue.
    pub fn fallback_writes(&self) -> u64 {
        self.shared.fallback_writes.load(Ordering::Relaxed)
    }

    /// Entries currently queued and not yet written.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.close();
    }
}

impl Shared {
    fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn write_queued(&self, entry: &Entry) {
        self.write_entry(entry);
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }

    fn write_direct(&self, entry: &Entry) {
        self.fallback_writes.fetch_add(1, Ordering::Relaxed);
        self.write_entry(entry);
    }

    fn write_entry(&self, entry: &Entry) {
        let formatted = self.formatter.format(entry);

        if self.config.mirrors_to_console(entry.level()) {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "{}", formatted.console);
        }

        if let Some(writer) = &self.writer {
            let mut line = formatted.file;
            line.push('\n');
            // The terminal action below still runs when this fails.
            if let Err(e) = writer.write(line.as_bytes()) {
                tracing::warn!(error = %e, level = %entry.level(), "log write failed");
            }
            line.pop();
            if entry.level().is_terminal() {
                self.apply_terminal_action(&line);
            }
        } else if entry.level().is_terminal() {
            self.apply_terminal_action(&formatted.file);
        }
    }

    fn apply_terminal_action(&self, line: &str) {
        match &self.config.terminal_action {
            TerminalAction::Continue => {}
            TerminalAction::Exit { code } => {
                if let Some(writer) = &self.writer {
                    let _ = writer.sync();
                }
                tracing::error!(code, "terminal log entry written, exiting");
                std::process::exit(*code);
            }
            TerminalAction::Callback(hook) => hook(line),
        }
    }

    fn flush(&self) {
        while self.pending.load(Ordering::Acquire) > 0
            && self.consumer_running.load(Ordering::Acquire)
        {
            thread::sleep(FLUSH_POLL);
        }
        if let Some(writer) = &self.writer {
            if let Err(e) = writer.sync() {
                tracing::warn!(error = %e, "log flush failed");
            }
        }
    }
}

/// Clears `consumer_running` however the consumer exits.
struct ConsumerGuard<'a>(&'a AtomicBool);

impl Drop for ConsumerGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn run_consumer(shared: Arc<Shared>, entries: Receiver<Entry>, shutdown: Receiver<()>) {
    let _running = ConsumerGuard(&shared.consumer_running);
    loop {
        select! {
            recv(entries) -> msg => match msg {
                Ok(entry) => shared.write_queued(&entry),
                Err(_) => return,
            },
            recv(shutdown) -> _ => {
                while let Ok(entry) = entries.try_recv() {
                    shared.write_queued(&entry);
                }
                return;
            }
        }
    }
}

fn run_flush_timer(shared: Arc<Shared>, interval: Duration, shutdown: Receiver<()>) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(ticker) -> _ => shared.flush(),
            recv(shutdown) -> _ => return,
        }
    }
}

/// Logs a templated entry at an explicit level.
///
/// The template is checked at compile time: unbalanced braces fail the
/// build. Arguments may be any `Display` value.
///
/// # Examples
///
/// ```
/// # use rotating_logger::{Logger, LogConfig, Level, log_entry};
/// # let dir = tempfile::tempdir().unwrap();
/// # let logger = Logger::new(LogConfig::new(dir.path().join("main.log"))).unwrap();
/// log_entry!(logger, Level::Info, "Temperature: {} C", 25.5);
/// log_entry!(logger, Level::Debug, "Status: {}, Count: {}", true, 42);
/// log_entry!(logger, Level::Warn, "no arguments");
/// ```
#[macro_export]
macro_rules! log_entry {
    ($logger:expr, $level:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        const _: () = assert!($crate::formatter::validate_template($fmt));
        $logger.logf($level, $fmt, &[$(&$arg as &dyn $crate::Loggable),*])
    }};
}

#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log_entry!($logger, $crate::Level::Trace, $($rest)+)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log_entry!($logger, $crate::Level::Info, $($rest)+)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log_entry!($logger, $crate::Level::Debug, $($rest)+)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log_entry!($logger, $crate::Level::Warn, $($rest)+)
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log_entry!($logger, $crate::Level::Error, $($rest)+)
    };
}
