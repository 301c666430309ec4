//! Intermediate-result limiter: a shared
//! counter guarding any operator that has to materialize its input before
//! it can produce output (`Sort`, a hash-join build side, `Aggregate`).
//! Exceeding the cap truncates rather than fails, recording a warning.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::logging::Logger;

/// The outcome of feeding a materializing operator's input through a
/// `Limiter`: `rows` is whatever survived the cap, `row_count`
/// is its length, and `warning` is set iff `truncated` is.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitedResult<T> {
    pub rows: Vec<T>,
    pub row_count: usize,
    pub truncated: bool,
    pub warning: Option<String>,
}

/// Shared across every materializing operator in one query's execution so
/// the cap is a whole-query budget, not a per-operator one.
#[derive(Clone)]
pub struct Limiter {
    max_rows: usize,
    accepted: Arc<AtomicUsize>,
    logger: Arc<dyn Logger>,
}

impl Limiter {
    pub fn new(max_rows: usize, logger: Arc<dyn Logger>) -> Self {
        Self { max_rows, accepted: Arc::new(AtomicUsize::new(0)), logger }
    }

    /// Consumes `input`, keeping up to `max_rows` total across every call
    /// this `Limiter` has handled so far, and logs
    /// `"Intermediate result limited to N rows (total: M)"` the
    /// first time the cap is exceeded.
    pub fn limit<T>(&self, input: Vec<T>) -> LimitedResult<T> {
        let total = input.len();
        let already = self.accepted.load(Ordering::SeqCst);
        let remaining = self.max_rows.saturating_sub(already);

        if total <= remaining {
            self.accepted.fetch_add(total, Ordering::SeqCst);
            return LimitedResult { rows: input, row_count: total, truncated: false, warning: None };
        }

        let mut rows = input;
        rows.truncate(remaining);
        self.accepted.fetch_add(remaining, Ordering::SeqCst);
        let warning = format!("Intermediate result limited to {} rows (total: {total})", self.max_rows);
        self.logger.warn("limiter", &warning);
        let row_count = rows.len();
        LimitedResult { rows, row_count, truncated: true, warning: Some(warning) }
    }

    pub fn accepted_so_far(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::CapturingLogger;

    #[test]
    fn under_cap_passes_through_untouched() {
        let logger = Arc::new(CapturingLogger::new());
        let limiter = Limiter::new(100_000, logger);
        let result = limiter.limit((0..10).collect::<Vec<_>>());
        assert!(!result.truncated);
        assert_eq!(result.row_count, 10);
        assert!(result.warning.is_none());
    }

    #[test]
    fn exceeding_cap_truncates_and_records_exact_warning_text() {
        let logger = Arc::new(CapturingLogger::new());
        let limiter = Limiter::new(100_000, logger.clone());
        let result = limiter.limit((0..150_000).collect::<Vec<_>>());
        assert!(result.truncated);
        assert_eq!(result.row_count, 100_000);
        let warning = result.warning.unwrap();
        assert_eq!(warning, "Intermediate result limited to 100000 rows (total: 150000)");
        assert!(logger.contains("Intermediate result limited to 100000 rows (total: 150000)"));
    }

    #[test]
    fn cap_is_shared_across_successive_calls() {
        let logger = Arc::new(CapturingLogger::new());
        let limiter = Limiter::new(100, logger);
        let first = limiter.limit((0..60).collect::<Vec<_>>());
        assert!(!first.truncated);
        let second = limiter.limit((0..60).collect::<Vec<_>>());
        assert!(second.truncated);
        assert_eq!(second.row_count, 40);
    }
}
