//! Structured JSON logger.
//!
//! One log line = one event. Lines are single JSON objects with a fixed
//! leading key order (`ts`, `level`, `event`) followed by the remaining
//! fields sorted alphabetically, so log output is diffable across runs.
//! Writes are synchronous and unbuffered.

use std::fmt;
use std::io::{self, Write};

use chrono::{SecondsFormat, Utc};

/// Log severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Diagnostic detail, off the hot path
    Debug = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues (e.g. a dropped notification)
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Level {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured logger writing one JSON object per line.
pub struct Logger;

impl Logger {
    /// Log an event at the given level. Errors go to stderr, everything
    /// else to stdout.
    pub fn log(level: Level, event: &str, fields: &[(&str, &str)]) {
        if level >= Level::Error {
            Self::write_line(level, event, fields, &mut io::stderr());
        } else {
            Self::write_line(level, event, fields, &mut io::stdout());
        }
    }

    fn write_line<W: Write>(level: Level, event: &str, fields: &[(&str, &str)], out: &mut W) {
        let mut line = String::with_capacity(192);

        line.push_str("{\"ts\":\"");
        line.push_str(&Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        line.push_str("\",\"level\":\"");
        line.push_str(level.as_str());
        line.push_str("\",\"event\":\"");
        escape_into(&mut line, event);
        line.push('"');

        let mut sorted: Vec<_> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);
        for (key, value) in sorted {
            line.push_str(",\"");
            escape_into(&mut line, key);
            line.push_str("\":\"");
            escape_into(&mut line, value);
            line.push('"');
        }

        line.push_str("}\n");

        // One write_all per line keeps concurrent log lines intact.
        let _ = out.write_all(line.as_bytes());
        let _ = out.flush();
    }

    /// Log at DEBUG level
    pub fn debug(event: &str, fields: &[(&str, &str)]) {
        Self::log(Level::Debug, event, fields);
    }

    /// Log at INFO level
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Level::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Level::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Level::Error, event, fields);
    }
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
}

#[cfg(test)]
fn capture(level: Level, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buf = Vec::new();
    Logger::write_line(level, event, fields, &mut buf);
    String::from_utf8(buf).unwrap()
}
