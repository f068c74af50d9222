//! Observability for bases
//!
//! - Structured JSON log lines, one per event
//! - Per-base atomic counters
//!
//! Observability is read-only: a failed log write never fails the
//! operation being observed.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{BaseMetrics, MetricsSnapshot};

/// Log an event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
