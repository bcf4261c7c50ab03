//! Observability
//!
//! - Structured JSON logging, one line per event
//! - Typed lifecycle events
//! - Per-tracker counters
//!
//! Observability never changes control flow: a failed log write is
//! swallowed and counters are relaxed atomics.
//!
//! # Usage
//!
//! ```ignore
//! use lsnwait::observability::{log_event_with_fields, Event, Logger, Severity};
//!
//! Logger::log(Severity::Info, "CUSTOM_EVENT", &[("key", "value")]);
//! log_event_with_fields(Event::MonitorStart, &[("tracker", "main")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Log a lifecycle event at an explicit severity
pub fn log_event_at(severity: Severity, event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}
