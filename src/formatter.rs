//! Rendering of entries into console and file lines.
//!
//! Formatting is pure: it reads the clock (or takes a time) and the entry,
//! and returns two strings. It holds no locks and may be called from any
//! thread, which is what lets the backpressure fallback format on the
//! caller's thread while the consumer formats on its own.

use std::fmt;

use chrono::{DateTime, Local, TimeZone};
use colored::{ColoredString, Colorize};

use crate::config::LogConfig;
use crate::entry::Entry;
use crate::level::Level;

/// Text substituted for a `{}` placeholder that has no matching argument.
pub const MISSING_ARG: &str = "{MISSING}";

const DATE_FORMAT: &str = "%Y/%m/%d";
const TIME_FORMAT: &str = "%H:%M:%S%.6f";

/// The two renditions of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedEntry {
    /// Line for standard error, possibly carrying ANSI color codes.
    pub console: String,
    /// Plain line for the log file, without the trailing newline.
    pub file: String,
}

/// Maps entries to header-prefixed lines.
#[derive(Debug, Clone)]
pub struct Formatter {
    app_name: String,
    color_output: bool,
}

impl Formatter {
    pub fn new(app_name: impl Into<String>, color_output: bool) -> Self {
        Self {
            app_name: app_name.into(),
            color_output,
        }
    }

    pub fn from_config(config: &LogConfig) -> Self {
        Self::new(config.app_name.clone(), config.color_output)
    }

    /// Formats an entry using the current local time.
    pub fn format(&self, entry: &Entry) -> FormattedEntry {
        self.format_at(entry, &Local::now())
    }

    /// Formats an entry as if it were logged at `now`.
    ///
    /// `Trace` entries return the raw message for both lines.
    pub fn format_at<Tz>(&self, entry: &Entry, now: &DateTime<Tz>) -> FormattedEntry
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let message = render_message(entry.template(), entry.args());
        if entry.level().is_raw() {
            return FormattedEntry {
                console: message.clone(),
                file: message,
            };
        }

        let date = now.format(DATE_FORMAT);
        let time = now.format(TIME_FORMAT);
        let file = format!(
            "[{}][{} {}][{}] {}",
            self.app_name,
            date,
            time,
            entry.level().tag(),
            message
        );

        let console = if self.color_output {
            let app = format!("[{}]", self.app_name).bold().truecolor(255, 255, 255);
            let stamp = format!("[{} {}]", date, time).truecolor(255, 255, 255);
            let level = level_style(entry.level(), format!("[{}]", entry.level().tag()));
            format!("{}{}{} {}", app, stamp, level, message)
        } else {
            file.clone()
        };

        FormattedEntry { console, file }
    }
}

/// White text on a level-specific background.
fn level_style(level: Level, tag: String) -> ColoredString {
    let (r, g, b) = match level {
        Level::Info => (39, 174, 96),
        Level::Debug => (55, 66, 250),
        Level::Warn => (255, 128, 0),
        Level::Error => (231, 76, 60),
        Level::Trace => return tag.normal(),
    };
    tag.truecolor(255, 255, 255).on_truecolor(r, g, b)
}

/// Builds the message body of an entry.
///
/// Without a template the arguments are joined with single spaces. With a
/// template, each `{}` takes the next argument, `{{` and `}}` are literal
/// braces, placeholders without an argument render as [`MISSING_ARG`], and
/// arguments left over are appended after the template, space separated.
pub fn render_message(template: Option<&str>, args: &[String]) -> String {
    let Some(template) = template else {
        return args.join(" ");
    };

    let capacity = template.len() + args.iter().map(|a| a.len() + 1).sum::<usize>();
    let mut result = String::with_capacity(capacity);
    let mut chars = template.chars().peekable();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        match (c, next) {
            ('{', Some('{')) | ('}', Some('}')) => {
                chars.next();
                result.push(c);
            }
            ('{', Some('}')) => {
                chars.next();
                match args.get(next_arg) {
                    Some(arg) => result.push_str(arg),
                    None => result.push_str(MISSING_ARG),
                }
                next_arg += 1;
            }
            _ => result.push(c),
        }
    }

    for extra in args.iter().skip(next_arg) {
        result.push(' ');
        result.push_str(extra);
    }
    result
}

/// Reports whether every brace in `template` is either escaped or part of a
/// positional `{}` placeholder.
pub const fn validate_template(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let next = if i + 1 < bytes.len() { bytes[i + 1] } else { 0 };
        match (bytes[i], next) {
            // `{{`, `}}` escapes and the positional `{}` placeholder
            (b'{', b'{') | (b'}', b'}') | (b'{', b'}') => i += 2,
            // Named or indexed placeholders are never substituted
            (b'{', _) | (b'}', _) => return false,
            _ => i += 1,
        }
    }
    true
}
