use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::error::{LoggerError, Result};

/// Size-based rotating file writer.
///
/// The writer appends to an active file and, when an append would take the
/// file past `max_size_bytes`, archives it as `<path>.<unix-nanos>` and starts
/// a fresh file at the original path.
///
/// # Locking
///
/// Appends share a read lock, so any number of threads may write at once.
/// Rotation takes the write lock and therefore waits for in-progress appends
/// and blocks new ones until the new file is open.
///
/// Rotation requests go through a single-slot flag. The first writer whose
/// bytes do not fit claims the slot and rotates before appending its own
/// bytes; writers that find the slot taken wait for the new file instead of
/// queueing another rotation. At most one rotation is in flight.
///
/// # Size accounting
///
/// `current_len` counts the bytes written or reserved by in-flight appends
/// since the file was opened (starting from the existing size when appending
/// to an old file). A writer reserves its bytes before appending, so
/// concurrent appends cannot jointly overshoot the limit. Only a write into
/// an empty file may exceed it, which bounds any file by the largest single
/// write.
///
/// # Failures
///
/// Rotation failures are reported through `tracing` and never returned to
/// the writer that triggered them. If the rename fails the original file is
/// reopened and logging continues in it. If the reopen fails the writer is
/// degraded: writes return an error until one of them manages to reopen the
/// active path.
///
/// # Examples
///
/// ```
/// # use rotating_logger::RotatingWriter;
/// # let dir = tempfile::tempdir().unwrap();
/// let writer = RotatingWriter::open(dir.path().join("app.log"), 64).unwrap();
/// writer.write(b"first line\n").unwrap();
/// assert_eq!(writer.current_len(), 11);
/// writer.close().unwrap();
/// ```
#[derive(Debug)]
pub struct RotatingWriter {
    path: PathBuf,
    max_size: u64,
    state: RwLock<WriterState>,
    current_len: AtomicU64,
    rotation_pending: AtomicBool,
    rotations: AtomicU64,
}

#[derive(Debug)]
struct WriterState {
    file: Option<File>,
    closed: bool,
    last_suffix: u128,
}

impl RotatingWriter {
    /// Opens (or creates) the active file at `path`, creating missing parent
    /// directories. Existing content is kept and counted toward the limit.
    pub fn open(path: impl Into<PathBuf>, max_size_bytes: u64) -> Result<Self> {
        let path = path.into();
        let (file, len) = open_active(&path)?;
        tracing::debug!(path = %path.display(), len, max_size_bytes, "opened log file");

        Ok(Self {
            path,
            max_size: max_size_bytes,
            state: RwLock::new(WriterState {
                file: Some(file),
                closed: false,
                last_suffix: 0,
            }),
            current_len: AtomicU64::new(len),
            rotation_pending: AtomicBool::new(false),
            rotations: AtomicU64::new(0),
        })
    }

    /// Appends `buf` to the active file, rotating first if it would overflow.
    ///
    /// Returns the number of bytes written, which is `buf.len()` on success.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let incoming = buf.len() as u64;
        let mut state = self.state.read();
        loop {
            if state.closed {
                return Err(io::Error::new(io::ErrorKind::Other, "log file closed"));
            }
            if state.file.is_some() && self.reserve(incoming) {
                break;
            }

            if self.claim_rotation() {
                drop(state);
                let mut exclusive = self.state.write();
                self.rotate_locked(&mut exclusive, incoming);
                self.rotation_pending.store(false, Ordering::Release);
                state = RwLockWriteGuard::downgrade(exclusive);
                if state.file.is_some() {
                    // The rotating writer always gets its bytes in, even if
                    // the rename failed and the old file stayed.
                    self.current_len.fetch_add(incoming, Ordering::AcqRel);
                }
                break;
            }

            // Another writer is rotating. The lock is fair, so once it is
            // waiting for exclusive access this read queues behind it.
            drop(state);
            thread::yield_now();
            state = self.state.read();
        }

        match state.file.as_ref() {
            Some(file) => self.append(file, buf),
            None if state.closed => Err(io::Error::new(io::ErrorKind::Other, "log file closed")),
            None => Err(io::Error::new(io::ErrorKind::Other, "log file unavailable")),
        }
    }

    /// Forces written data down to the storage device.
    pub fn sync(&self) -> io::Result<()> {
        match self.state.read().file.as_ref() {
            Some(file) => file.sync_data(),
            None => Ok(()),
        }
    }

    /// Syncs and releases the file handle. Later writes fail.
    pub fn close(&self) -> io::Result<()> {
        let mut state = self.state.write();
        state.closed = true;
        match state.file.take() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }

    /// Bytes in the active file as tracked by the writer.
    pub fn current_len(&self) -> u64 {
        self.current_len.load(Ordering::Acquire)
    }

    /// Number of completed rotations since the writer was opened.
    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Acquire)
    }

    /// True when no file is open because a reopen failed.
    pub fn is_degraded(&self) -> bool {
        let state = self.state.read();
        state.file.is_none() && !state.closed
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    fn needs_rotation(&self, incoming: u64) -> bool {
        let len = self.current_len();
        len > 0 && len.saturating_add(incoming) > self.max_size
    }

    /// Accounts for `incoming` bytes if they fit below the limit. An empty
    /// file takes any write.
    fn reserve(&self, incoming: u64) -> bool {
        self.current_len
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |len| {
                (len == 0 || len.saturating_add(incoming) <= self.max_size)
                    .then(|| len + incoming)
            })
            .is_ok()
    }

    /// Takes the single rotation slot. Fails if another writer holds it.
    fn claim_rotation(&self) -> bool {
        self.rotation_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Writes `buf` whose length was already added to `current_len`.
    fn append(&self, mut file: &File, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            let result = match file.write(&buf[written..]) {
                Ok(0) => Err(io::Error::new(io::ErrorKind::WriteZero, "failed to write log line")),
                Ok(n) => {
                    written += n;
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
            self.current_len
                .fetch_sub((buf.len() - written) as u64, Ordering::AcqRel);
            return result;
        }
        Ok(written)
    }

    fn rotate_locked(&self, state: &mut WriterState, incoming: u64) {
        if state.closed {
            return;
        }
        if state.file.is_none() {
            self.reopen_locked(state);
            return;
        }
        // A rotation that finished while we waited for the lock may have
        // already made room.
        if !self.needs_rotation(incoming) {
            return;
        }

        drop(state.file.take());
        let archive = self.next_archive_name(state);
        if let Err(e) = fs::rename(&self.path, &archive) {
            tracing::error!(
                path = %self.path.display(),
                archive = %archive.display(),
                error = %e,
                "log rotate failed"
            );
            self.reopen_locked(state);
            return;
        }

        self.rotations.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(archive = %archive.display(), "rotated log file");
        self.current_len.store(0, Ordering::Release);
        self.reopen_locked(state);
    }

    fn reopen_locked(&self, state: &mut WriterState) {
        match open_active(&self.path) {
            Ok((file, len)) => {
                state.file = Some(file);
                self.current_len.store(len, Ordering::Release);
            }
            Err(e) => {
                state.file = None;
                self.current_len.store(0, Ordering::Release);
                tracing::error!(error = %e, "reopen log file failed");
            }
        }
    }

    /// `<path>.<unix-nanos>`, strictly increasing and never an existing file.
    fn next_archive_name(&self, state: &mut WriterState) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let mut suffix = now.max(state.last_suffix + 1);
        loop {
            let candidate = archive_path(&self.path, suffix);
            if !candidate.exists() {
                state.last_suffix = suffix;
                return candidate;
            }
            suffix += 1;
        }
    }
}

impl Write for &RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The archive path for `path` with a given suffix.
pub(crate) fn archive_path(path: &Path, suffix: u128) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{}", suffix));
    PathBuf::from(name)
}

fn open_active(path: &Path) -> Result<(File, u64)> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| LoggerError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggerError::OpenFile {
            path: path.to_path_buf(),
            source,
        })?;

    let len = file
        .metadata()
        .map_err(|source| LoggerError::Stat {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    Ok((file, len))
}
