//! Structured JSON logger
//!
//! - One log line = one event
//! - `event`, `severity`, `ts` first, then fields in alphabetical order
//! - Synchronous, no buffering
//! - ERROR and FATAL go to stderr, everything else to stdout

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Unrecoverable
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Info as u8);

#[derive(Serialize)]
struct LogLine<'a> {
    event: &'a str,
    severity: &'static str,
    ts: String,
    #[serde(flatten)]
    fields: BTreeMap<&'a str, &'a str>,
}

/// Caller fields may not shadow the line header.
fn field_key(key: &str) -> &str {
    match key {
        "event" => "field_event",
        "severity" => "field_severity",
        "ts" => "field_ts",
        other => other,
    }
}

/// A structured logger that outputs JSON lines
pub struct Logger;

impl Logger {
    /// Set the lowest severity that is written. Defaults to INFO.
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    /// Current lowest written severity
    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// Log an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if severity < Self::min_severity() {
            return;
        }
        if severity >= Severity::Error {
            Self::log_to_writer(severity, event, fields, &mut io::stderr());
        } else {
            Self::log_to_writer(severity, event, fields, &mut io::stdout());
        }
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let line = Self::render(severity, event, fields);
        // Logging never fails the caller
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let line = LogLine {
            event,
            severity: severity.as_str(),
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            fields: fields
                .iter()
                .map(|&(key, value)| (field_key(key), value))
                .collect(),
        };
        let mut output = serde_json::to_string(&line).unwrap_or_else(|e| {
            format!(
                "{{\"event\":\"LOG_ENCODE_FAILED\",\"severity\":\"ERROR\",\"reason\":{:?}}}",
                e.to_string()
            )
        });
        output.push('\n');
        output
    }
}

/// Capture a rendered log line for testing
#[cfg(test)]
pub fn capture_log(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buffer = Vec::new();
    Logger::log_to_writer(severity, event, fields, &mut buffer);
    String::from_utf8(buffer).unwrap()
}
