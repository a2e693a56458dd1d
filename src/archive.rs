//! Reader utilities for an active log file and its rotated archives.
//!
//! Rotation renames the active file to `<path>.<unix-nanos>`. This module
//! finds those archives again and reads lines back across all of them in the
//! order they were written.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// A rotated file belonging to an active log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedFile {
    /// Full path of the archive.
    pub path: PathBuf,
    /// The nanosecond timestamp suffix. Larger suffixes are newer.
    pub suffix: u128,
}

impl ArchivedFile {
    /// Reads the archive's lines, without their newlines.
    pub fn lines(&self) -> io::Result<Vec<String>> {
        read_file_lines(&self.path)
    }

    /// Size of the archive on disk.
    pub fn len(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }
}

/// Lists the archives of `active`, oldest first.
///
/// Only siblings named exactly `<file name>.<digits>` count; anything else in
/// the directory is ignored. A missing directory yields an empty list.
///
/// # Examples
///
/// ```
/// # use rotating_logger::archive::list_archives;
/// # let dir = tempfile::tempdir().unwrap();
/// let active = dir.path().join("main.log");
/// std::fs::write(dir.path().join("main.log.200"), "b\n").unwrap();
/// std::fs::write(dir.path().join("main.log.100"), "a\n").unwrap();
/// std::fs::write(dir.path().join("main.log.bak"), "ignored\n").unwrap();
///
/// let archives = list_archives(&active).unwrap();
/// let suffixes: Vec<u128> = archives.iter().map(|a| a.suffix).collect();
/// assert_eq!(suffixes, vec![100, 200]);
/// ```
pub fn list_archives(active: &Path) -> io::Result<Vec<ArchivedFile>> {
    let Some(file_name) = active.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let dir = match active.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let read_dir = match fs::read_dir(&dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let prefix = format!("{}.", file_name);
    let mut archives = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = dir_entry?;
        let name = dir_entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(suffix) = parse_suffix(name, &prefix) {
            archives.push(ArchivedFile {
                path: dir_entry.path(),
                suffix,
            });
        }
    }

    archives.sort_by_key(|a| a.suffix);
    Ok(archives)
}

/// Reads every line of the log, archives first (oldest to newest), then the
/// active file. A missing active file contributes no lines.
pub fn read_lines(active: &Path) -> io::Result<Vec<String>> {
    let mut lines = Vec::new();
    for archive in list_archives(active)? {
        lines.extend(archive.lines()?);
    }
    match read_file_lines(active) {
        Ok(active_lines) => lines.extend(active_lines),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    Ok(lines)
}

/// Total bytes held by the active file and its archives.
pub fn total_size(active: &Path) -> io::Result<u64> {
    let mut total = 0;
    for archive in list_archives(active)? {
        total += archive.len()?;
    }
    match fs::metadata(active) {
        Ok(meta) => total += meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    Ok(total)
}

fn parse_suffix(name: &str, prefix: &str) -> Option<u128> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn read_file_lines(path: &Path) -> io::Result<Vec<String>> {
    let reader = BufReader::new(fs::File::open(path)?);
    reader.lines().collect()
}
