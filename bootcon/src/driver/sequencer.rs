//! Running command lists with bounded retries.

use log::{debug, warn};

use super::command::CommandList;
use super::outcome::{SequenceFailure, SuccessKind};
use super::poller::CommandPoller;
use super::state::SessionState;
use crate::config::EngineConfig;
use crate::notify::NotificationSink;
use crate::transport::Transport;

/// Runs every command of a list in order, retrying each one up to the
/// configured number of attempts.
///
/// The first command that fails every attempt aborts the rest of the list;
/// nothing after it is ever written.
#[derive(Debug, Clone, Copy)]
pub struct CommandSequencer {
    poller: CommandPoller,
    max_attempts: usize,
}

impl CommandSequencer {
    /// Create a sequencer from the engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            poller: CommandPoller::new(config),
            max_attempts: config.max_attempts.max(1),
        }
    }

    /// The poller used for each attempt.
    pub fn poller(&self) -> &CommandPoller {
        &self.poller
    }

    /// Run `commands`, emitting one progress tick per answered command.
    pub async fn run<T: Transport>(
        &self,
        transport: &mut T,
        state: &mut SessionState,
        commands: &CommandList,
        sink: &mut dyn NotificationSink,
    ) -> Result<SuccessKind, SequenceFailure> {
        for (index, command) in commands.iter().enumerate() {
            let mut attempt = 1;
            loop {
                match self.poller.poll(transport, state, command).await {
                    Ok(matches) => {
                        debug!(
                            "command {} answered on attempt {} ({} match(es))",
                            index,
                            attempt,
                            matches.len()
                        );
                        break;
                    }
                    Err(err) if attempt < self.max_attempts => {
                        debug!("command {} attempt {} failed: {}", index, attempt, err);
                        attempt += 1;
                    }
                    Err(err) => {
                        warn!(
                            "command {} failed after {} attempt(s), aborting sequence: {}",
                            index, attempt, err
                        );
                        return Err(SequenceFailure {
                            index,
                            attempts: attempt,
                            source: err,
                        });
                    }
                }
            }
            sink.progress_increase();
        }

        Ok(SuccessKind::Step)
    }
}
