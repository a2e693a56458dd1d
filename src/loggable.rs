use std::fmt;

/// A value that can be passed as a log argument.
///
/// Arguments are rendered to text on the calling thread when the entry is
/// built, so the entry that crosses into the consumer thread owns plain
/// strings and borrows nothing from the caller. This is automatically
/// implemented for all types that implement Display.
pub trait Loggable {
    /// Renders self as it should appear in the log message.
    fn render(&self) -> String;
}

// Generic implementation for Display types
impl<T> Loggable for T
where
    T: fmt::Display + ?Sized,
{
    fn render(&self) -> String {
        self.to_string()
    }
}

/// Renders a slice of arguments in order.
pub fn render_all(args: &[&dyn Loggable]) -> Vec<String> {
    args.iter().map(|arg| arg.render()).collect()
}
