//! Command/response engine for a bootloader console.
//!
//! The driver layer sends commands, waits for answers matching a pattern,
//! retries bounded times, and reports step outcomes to a
//! [`NotificationSink`](crate::notify::NotificationSink).
//!
//! Layering, bottom up:
//!
//! - [`CommandPoller`] runs one drain, write, await-match attempt.
//! - [`CommandSequencer`] runs a [`CommandList`] with retries.
//! - [`Session`] owns the transport and state, reports steps, and writes
//!   the log artifact on [`Session::stop`].

mod builder;
mod command;
mod outcome;
mod poller;
mod sequencer;
mod session;
mod state;

pub use builder::SessionBuilder;
pub use command::{
    Command, CommandList, CommandListBuilder, CommandListBuilderWithPayload, DEFAULT_DEBUG_MESSAGE,
};
pub use outcome::{SequenceFailure, SuccessKind};
pub use poller::{CLEAN_TIMEOUT_MESSAGE, CONNECTION_LOST_MESSAGE, CommandPoller};
pub use sequencer::CommandSequencer;
pub use session::{LIST_SETTLE, Session};
pub use state::SessionState;
