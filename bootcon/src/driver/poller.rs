//! One clean, write, await-match cycle for a single command.
//!
//! An attempt moves through `Cleaning → Writing → AwaitingMatch` and ends
//! `Matched`, `TimedOut` or `ConnectionLost`. The answer is re-matched
//! after every tick, so a fast console is answered on the first tick while
//! a slow one still gets the whole budget. Answers are accumulated, never
//! replaced, because a single line often arrives over several reads.

use std::time::Duration;

use bytes::BytesMut;
use log::trace;

use super::command::Command;
use super::state::SessionState;
use crate::channel::{BufferCleaner, MatchSet, ResponseMatcher};
use crate::config::EngineConfig;
use crate::error::{PollError, TransportError};
use crate::transport::Transport;

/// Debug text recorded when stale input cannot be drained.
pub const CLEAN_TIMEOUT_MESSAGE: &str = "failed to clear input buffer.";

/// Debug text recorded when the transport fails.
pub const CONNECTION_LOST_MESSAGE: &str = "connection lost.";

/// Runs single poll attempts. Never retries and never notifies.
#[derive(Debug, Clone, Copy)]
pub struct CommandPoller {
    cleaner: BufferCleaner,
    tick: Duration,
    base_timeout: Duration,
}

impl CommandPoller {
    /// Create a poller from the engine timings.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cleaner: BufferCleaner::new(config.tick, config.max_clean_duration),
            tick: config.tick,
            base_timeout: config.base_timeout,
        }
    }

    /// Answer budget for `command`.
    pub fn timeout_for(&self, command: &Command) -> Duration {
        self.base_timeout.saturating_add(command.extra_timeout)
    }

    /// Run one attempt of `command`.
    ///
    /// Returns the match set as soon as the accumulated answer matches.
    /// On failure `state.debug_message` explains why, and
    /// `state.last_request`/`state.last_answer` describe this attempt.
    pub async fn poll<T: Transport>(
        &self,
        transport: &mut T,
        state: &mut SessionState,
        command: &Command,
    ) -> Result<MatchSet, PollError> {
        if let Err(err) = self.cleaner.drain(transport, &mut state.input_buffer).await {
            state.debug_message = Some(debug_message_for(&err, command));
            return Err(err);
        }

        state.last_request = Some(command.payload.clone());
        if let Err(err) = transport.write(&command.payload).await {
            return Err(connection_lost(state, err));
        }

        let timeout = self.timeout_for(command);
        let mut waited = Duration::ZERO;
        let mut answer = BytesMut::new();

        while waited < timeout {
            tokio::time::sleep(self.tick).await;
            waited += self.tick;

            let chunk = match transport.read_available().await {
                Ok(chunk) => chunk,
                Err(err) => return Err(connection_lost(state, err)),
            };

            answer.extend_from_slice(&chunk);
            state.input_buffer.extend(&chunk);
            trace!(
                "poll: {} bytes after {:?}, answer {} bytes",
                chunk.len(),
                waited,
                answer.len()
            );
            state.last_answer = Some(chunk);

            if let Some(matches) = command.pattern.match_set(&answer) {
                return Ok(matches);
            }
        }

        state.debug_message = Some(command.debug_message.clone());
        Err(PollError::AnswerMatch { timeout })
    }
}

fn connection_lost(state: &mut SessionState, err: TransportError) -> PollError {
    state.debug_message = Some(CONNECTION_LOST_MESSAGE.to_string());
    PollError::ConnectionLost(err)
}

fn debug_message_for(err: &PollError, command: &Command) -> String {
    match err {
        PollError::BufferCleanTimeout { .. } => CLEAN_TIMEOUT_MESSAGE.to_string(),
        PollError::AnswerMatch { .. } => command.debug_message.clone(),
        PollError::ConnectionLost(_) => CONNECTION_LOST_MESSAGE.to_string(),
    }
}
