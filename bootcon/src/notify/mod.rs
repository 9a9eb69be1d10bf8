//! Outbound notifications to the calling process.
//!
//! The engine only ever calls a [`NotificationSink`]; it never queues or
//! replays events itself. A UI running on another thread should use
//! [`ChannelSink`] and drain the receiving end on its own schedule.

mod recording;

use std::borrow::Cow;

use log::debug;
use tokio::sync::mpsc::UnboundedSender;

pub use recording::RecordingSink;

/// Details of a step that failed terminally.
///
/// Request and answer bytes are already scrubbed of the deployment secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Label of the failed step.
    pub step_label: String,

    /// Payload of the last attempt.
    pub last_request: Vec<u8>,

    /// Bytes read on the last tick of the last attempt.
    pub last_answer: Vec<u8>,

    /// Explanation of the failure class.
    pub debug_message: String,
}

impl ErrorReport {
    /// Last request, lossily decoded.
    pub fn request_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.last_request)
    }

    /// Last answer, lossily decoded.
    pub fn answer_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.last_answer)
    }
}

/// A single notification, as delivered through a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// One command answered.
    Progress,
    /// A step finished successfully.
    StepDone(usize),
    /// A step failed terminally.
    Error(ErrorReport),
    /// No further steps will run.
    EndOfSequence,
}

/// Receiver of engine progress and failure events.
pub trait NotificationSink: Send {
    /// One command was answered.
    fn progress_increase(&mut self);

    /// Step `step_index` finished successfully.
    fn step_done(&mut self, step_index: usize);

    /// A step failed terminally.
    fn error(&mut self, report: ErrorReport);

    /// No further steps will run.
    fn end_of_sequence(&mut self);
}

/// Sink that discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn progress_increase(&mut self) {}

    fn step_done(&mut self, _step_index: usize) {}

    fn error(&mut self, _report: ErrorReport) {}

    fn end_of_sequence(&mut self) {}
}

/// Sink forwarding notifications into an unbounded tokio channel.
///
/// Sending never blocks; if the receiver is gone, notifications are
/// dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<Notification>,
}

impl ChannelSink {
    /// Wrap a channel sender.
    pub fn new(tx: UnboundedSender<Notification>) -> Self {
        Self { tx }
    }

    fn send(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("notification receiver dropped");
        }
    }
}

impl NotificationSink for ChannelSink {
    fn progress_increase(&mut self) {
        self.send(Notification::Progress);
    }

    fn step_done(&mut self, step_index: usize) {
        self.send(Notification::StepDone(step_index));
    }

    fn error(&mut self, report: ErrorReport) {
        self.send(Notification::Error(report));
    }

    fn end_of_sequence(&mut self) {
        self.send(Notification::EndOfSequence);
    }
}
