//! Reporting - What the User Sees
//!
//! Operations never print directly. They talk to a `Reporter`, so the CLI
//! gets colored console lines and tests get a plain transcript.

use owo_colors::{OwoColorize, Stream};
use std::cell::RefCell;

pub trait Reporter {
    /// An operation is starting.
    fn start(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    /// The operation finished successfully.
    fn success(&self, message: &str);
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn start(&self, message: &str) {
        (**self).start(message)
    }
    fn info(&self, message: &str) {
        (**self).info(message)
    }
    fn warn(&self, message: &str) {
        (**self).warn(message)
    }
    fn error(&self, message: &str) {
        (**self).error(message)
    }
    fn success(&self, message: &str) {
        (**self).success(message)
    }
}

/// Console output. Status goes to stdout, problems to stderr.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    colored: bool,
}

impl ConsoleReporter {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// Plain text, no escape codes.
    pub fn plain() -> Self {
        Self::new(false)
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Reporter for ConsoleReporter {
    fn start(&self, message: &str) {
        let line = format!("➡️  Starting: {message}");
        if self.colored {
            println!("{}", line.if_supports_color(Stream::Stdout, |t| t.blue()));
        } else {
            println!("{line}");
        }
    }

    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn warn(&self, message: &str) {
        let line = format!("⚠️  Warning: {message}");
        if self.colored {
            eprintln!("{}", line.if_supports_color(Stream::Stderr, |t| t.yellow()));
        } else {
            eprintln!("{line}");
        }
    }

    fn error(&self, message: &str) {
        let line = format!("❌ Error: {message}");
        if self.colored {
            eprintln!("{}", line.if_supports_color(Stream::Stderr, |t| t.red()));
        } else {
            eprintln!("{line}");
        }
    }

    fn success(&self, message: &str) {
        let line = format!("✅ {message}");
        if self.colored {
            println!("{}", line.if_supports_color(Stream::Stdout, |t| t.green()));
        } else {
            println!("{line}");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Start,
    Info,
    Warn,
    Error,
    Success,
}

/// Records every line; used by tests and by callers that want a transcript.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: RefCell<Vec<(Level, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.borrow().clone()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        self.lines.borrow_mut().push((level, message.to_string()));
    }
}

impl Reporter for MemoryReporter {
    fn start(&self, message: &str) {
        self.push(Level::Start, message)
    }
    fn info(&self, message: &str) {
        self.push(Level::Info, message)
    }
    fn warn(&self, message: &str) {
        self.push(Level::Warn, message)
    }
    fn error(&self, message: &str) {
        self.push(Level::Error, message)
    }
    fn success(&self, message: &str) {
        self.push(Level::Success, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn announce(reporter: impl Reporter) {
        reporter.start("Validating YAML data");
        reporter.warn("second pass exited with 1");
        reporter.success("done");
    }

    #[test]
    fn test_memory_reporter_records_in_order() {
        let memory = MemoryReporter::new();
        announce(&memory);
        let lines = memory.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], (Level::Start, "Validating YAML data".to_string()));
        assert_eq!(memory.messages(Level::Warn), vec!["second pass exited with 1"]);
        assert!(memory.messages(Level::Error).is_empty());
    }

    #[test]
    fn test_console_reporter_plain_does_not_panic() {
        announce(ConsoleReporter::plain());
    }
}
