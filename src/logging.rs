//! Explicit logging facade: direct accessors and a facade every component
//! receives by construction, rather than annotation-driven logging, so
//! test harnesses can capture output deterministically.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// A component logger. Components take `Arc<dyn Logger>` at construction
/// time rather than reaching for a process-wide logger.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, component: &str, message: &str);

    fn debug(&self, component: &str, message: &str) {
        self.log(Level::Debug, component, message);
    }
    fn info(&self, component: &str, message: &str) {
        self.log(Level::Info, component, message);
    }
    fn warn(&self, component: &str, message: &str) {
        self.log(Level::Warn, component, message);
    }
    fn error(&self, component: &str, message: &str) {
        self.log(Level::Error, component, message);
    }
}

/// Forwards to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdLogger;

impl Logger for StdLogger {
    fn log(&self, level: Level, component: &str, message: &str) {
        match level {
            Level::Debug => log::debug!(target: "fedsql", "[{component}] {message}"),
            Level::Info => log::info!(target: "fedsql", "[{component}] {message}"),
            Level::Warn => log::warn!(target: "fedsql", "[{component}] {message}"),
            Level::Error => log::error!(target: "fedsql", "[{component}] {message}"),
        }
    }
}

/// Captures every record in-memory; used by tests that need to assert on
/// what a component logged (truncation warnings, retry backoff, etc).
#[derive(Debug, Default)]
pub struct CapturingLogger {
    records: Mutex<Vec<(Level, String, String)>>,
}

impl CapturingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Level, String, String)> {
        self.records.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.records
            .lock()
            .unwrap()
            .iter()
            .any(|(_, _, msg)| msg.contains(needle))
    }
}

impl Logger for CapturingLogger {
    fn log(&self, level: Level, component: &str, message: &str) {
        self.records
            .lock()
            .unwrap()
            .push((level, component.to_string(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capturing_logger_records_messages_with_component() {
        let logger = CapturingLogger::new();
        logger.warn("limiter", "Intermediate result limited to 100000 rows (total: 150000)");
        assert!(logger.contains("Intermediate result limited"));
        let records = logger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, Level::Warn);
        assert_eq!(records[0].1, "limiter");
    }

    #[test]
    fn level_ordering_is_severity_ascending() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }
}
