use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Severity of a log entry.
///
/// Levels are ordered by their numeric value (`Trace` is -1, `Error` is 3).
/// The ordering is only used for filtering; no level escalates to another.
///
/// `Trace` is special: it skips the standard header and writes the message
/// exactly as given. It is meant for banners and startup separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = -1,
    Info = 0,
    Debug = 1,
    #[serde(alias = "warning")]
    Warn = 2,
    Error = 3,
}

impl Level {
    /// All levels, lowest first.
    pub const ALL: [Level; 5] = [Level::Trace, Level::Info, Level::Debug, Level::Warn, Level::Error];

    /// The five-character tag written inside the level brackets.
    ///
    /// Shorter names are padded with a trailing space so every header has the
    /// same width. `Trace` never gets a header, its tag exists for display only.
    pub fn tag(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Warn => "WARN ",
            Level::Error => "ERROR",
        }
    }

    /// Whether this level bypasses header formatting.
    #[inline]
    pub fn is_raw(self) -> bool {
        self == Level::Trace
    }

    /// Whether this level is subject to the configured terminal action.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self == Level::Error
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag().trim_end())
    }
}

/// Error returned when parsing an unknown level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(pub String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level: {}", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            other => Err(ParseLevelError(other.to_string())),
        }
    }
}
