//! Centralized error reporting.
//!
//! Failures in one alarm, one mirror, or one playback session must never
//! block the rest of the system. Components hand their failures to an
//! [`ErrorReporter`] and move on; the reporter decides what to do with them
//! (log, telemetry, nothing). Swapping the sink never touches call sites.

use std::sync::Mutex;

use tracing::error;

/// Fire-and-forget error sink.
///
/// Implementations must never panic and never block the caller.
pub trait ErrorReporter: Send + Sync {
    /// Reports a failure with a short context label (e.g. `"radio-directory"`).
    fn report(&self, context: &str, error: &dyn std::fmt::Display);
}

/// Reporter that writes failures to the tracing log.
#[derive(Debug, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, context: &str, err: &dyn std::fmt::Display) {
        error!(context, "{}", err);
    }
}

/// Mock reporter for testing.
///
/// Records every reported failure so tests can assert on count and content.
#[derive(Debug, Default)]
pub struct MockErrorReporter {
    reports: Mutex<Vec<(String, String)>>,
}

impl MockErrorReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of reported failures.
    #[must_use]
    pub fn report_count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    /// Returns all recorded `(context, message)` pairs.
    #[must_use]
    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.reports.lock().unwrap().clear();
    }
}

impl ErrorReporter for MockErrorReporter {
    fn report(&self, context: &str, err: &dyn std::fmt::Display) {
        self.reports
            .lock()
            .unwrap()
            .push((context.to_string(), err.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_reporter_does_not_panic() {
        let reporter = LogReporter;
        reporter.report("test", &"something went wrong");
    }

    #[test]
    fn test_mock_records_reports() {
        let reporter = MockErrorReporter::new();
        assert_eq!(reporter.report_count(), 0);

        reporter.report("storage", &"disk full");
        reporter.report("radio-directory", &"all mirrors failed");

        assert_eq!(reporter.report_count(), 2);
        let reports = reporter.reports();
        assert_eq!(reports[0], ("storage".to_string(), "disk full".to_string()));
        assert_eq!(reports[1].0, "radio-directory");
    }

    #[test]
    fn test_mock_clear() {
        let reporter = MockErrorReporter::new();
        reporter.report("a", &"x");
        reporter.clear();
        assert_eq!(reporter.report_count(), 0);
    }
}
