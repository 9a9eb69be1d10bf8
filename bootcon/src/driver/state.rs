//! Mutable per-session engine state.

use bytes::Bytes;

use crate::channel::SessionBuffer;

/// State owned by exactly one session.
///
/// `last_request`, `last_answer` and `debug_message` are overwritten by
/// every poll attempt, so whenever a failure is reported they describe
/// the attempt that produced it.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Everything read from the console this session.
    pub(crate) input_buffer: SessionBuffer,

    /// Payload of the most recent attempt.
    pub(crate) last_request: Option<Bytes>,

    /// Bytes read on the most recent tick of the most recent attempt.
    pub(crate) last_answer: Option<Vec<u8>>,

    /// Explanation of the most recent failure.
    pub(crate) debug_message: Option<String>,

    /// Steps completed successfully.
    pub(crate) completed_steps: usize,
}

impl SessionState {
    /// Fresh state for a new session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything read from the console this session.
    pub fn input_buffer(&self) -> &SessionBuffer {
        &self.input_buffer
    }

    /// Payload of the most recent attempt.
    pub fn last_request(&self) -> Option<&[u8]> {
        self.last_request.as_deref()
    }

    /// Bytes read on the most recent tick.
    pub fn last_answer(&self) -> Option<&[u8]> {
        self.last_answer.as_deref()
    }

    /// Explanation of the most recent failure.
    pub fn debug_message(&self) -> Option<&str> {
        self.debug_message.as_deref()
    }

    /// Steps completed successfully.
    pub fn completed_steps(&self) -> usize {
        self.completed_steps
    }
}
