use crate::level::Level;
use crate::loggable::{render_all, Loggable};

/// One log call awaiting formatting and persistence.
///
/// An entry is immutable once built. It carries no timestamp: the time is
/// read when the entry is formatted, which for queued entries happens on the
/// consumer thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    level: Level,
    template: Option<String>,
    args: Vec<String>,
}

impl Entry {
    /// Builds an entry whose arguments are joined without a template.
    pub fn new(level: Level, args: &[&dyn Loggable]) -> Self {
        Self {
            level,
            template: None,
            args: render_all(args),
        }
    }

    /// Builds an entry whose arguments are substituted into `template`.
    ///
    /// An empty template behaves like [`Entry::new`].
    pub fn with_template(level: Level, template: &str, args: &[&dyn Loggable]) -> Self {
        Self {
            level,
            template: (!template.is_empty()).then(|| template.to_string()),
            args: render_all(args),
        }
    }

    /// Builds an entry from arguments that were already rendered.
    pub fn from_parts(level: Level, template: Option<String>, args: Vec<String>) -> Self {
        Self {
            level,
            template: template.filter(|t| !t.is_empty()),
            args,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}
