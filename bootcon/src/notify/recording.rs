//! Sink that keeps every notification in memory.

use super::{ErrorReport, Notification, NotificationSink};

/// Records notifications in order; handy for tests and batch tooling.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Vec<Notification>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification so far, in order.
    pub fn events(&self) -> &[Notification] {
        &self.events
    }

    /// Number of progress ticks.
    pub fn progress_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Notification::Progress))
            .count()
    }

    /// Every error report, in order.
    pub fn errors(&self) -> Vec<&ErrorReport> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Notification::Error(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    /// Number of end-of-sequence notifications.
    pub fn end_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Notification::EndOfSequence))
            .count()
    }
}

impl NotificationSink for RecordingSink {
    fn progress_increase(&mut self) {
        self.events.push(Notification::Progress);
    }

    fn step_done(&mut self, step_index: usize) {
        self.events.push(Notification::StepDone(step_index));
    }

    fn error(&mut self, report: ErrorReport) {
        self.events.push(Notification::Error(report));
    }

    fn end_of_sequence(&mut self) {
        self.events.push(Notification::EndOfSequence);
    }
}
