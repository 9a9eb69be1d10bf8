//! Console commands and ordered command lists.
//!
//! A bootloader step is usually a short dialogue:
//! - `setenv bootargs ...` answered by the console prompt
//! - `tftp 0x80000000 uImage` answered by `Bytes transferred`
//! - `bootm` answered by `Starting kernel`
//!
//! Each line is a [`Command`]: the bytes to write, the pattern that
//! proves the console accepted it, and how much longer than the base
//! timeout the answer may take.

use std::time::Duration;

use bytes::Bytes;
use regex::bytes::Regex;

use crate::channel::compile_pattern;

/// Debug text reported when a command has none of its own.
pub const DEFAULT_DEBUG_MESSAGE: &str = "expected answer not received.";

/// One request to the console and the answer it must produce.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use bootcon::driver::Command;
///
/// let cmd = Command::new("tftp 0x80000000 uImage\r\n", r"Bytes transferred")
///     .unwrap()
///     .with_extra_timeout(Duration::from_secs(30))
///     .with_debug_message("kernel image download failed.");
/// assert_eq!(cmd.payload.as_ref(), b"tftp 0x80000000 uImage\r\n");
/// ```
#[derive(Debug, Clone)]
pub struct Command {
    /// Bytes written to the console, verbatim.
    pub payload: Bytes,

    /// Pattern searched for in the answer.
    pub pattern: Regex,

    /// Time allowed on top of the base answer timeout.
    pub extra_timeout: Duration,

    /// Explanation reported if the answer never matches.
    pub debug_message: String,
}

impl Command {
    /// Create a command, compiling its expected-answer pattern.
    pub fn new(payload: impl Into<Bytes>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::from_regex(payload, compile_pattern(pattern)?))
    }

    /// Create a command from an already compiled pattern.
    pub fn from_regex(payload: impl Into<Bytes>, pattern: Regex) -> Self {
        Self {
            payload: payload.into(),
            pattern,
            extra_timeout: Duration::ZERO,
            debug_message: DEFAULT_DEBUG_MESSAGE.to_string(),
        }
    }

    /// Allow the answer this much longer than the base timeout.
    pub fn with_extra_timeout(mut self, extra: Duration) -> Self {
        self.extra_timeout = extra;
        self
    }

    /// Set the explanation reported when the answer never matches.
    pub fn with_debug_message(mut self, message: impl Into<String>) -> Self {
        self.debug_message = message.into();
        self
    }
}

/// Ordered commands forming one step. Order is execution order.
#[derive(Debug, Clone, Default)]
pub struct CommandList {
    commands: Vec<Command>,
}

impl CommandList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a list fluently.
    pub fn builder() -> CommandListBuilder {
        CommandListBuilder::default()
    }

    /// Append a command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Command at `index`.
    pub fn get(&self, index: usize) -> Option<&Command> {
        self.commands.get(index)
    }

    /// Iterate in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }
}

impl FromIterator<Command> for CommandList {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

/// Builder for command lists.
///
/// Pattern errors are held until [`build`](Self::build) so the chain
/// stays fluent.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use bootcon::driver::CommandList;
///
/// let commands = CommandList::builder()
///     .send("PING\r\n")
///     .expect("PONG")
///     .send("BOOT\r\n")
///     .with_extra_timeout(Duration::from_secs(5))
///     .expect("Booting")
///     .build()
///     .unwrap();
/// assert_eq!(commands.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct CommandListBuilder {
    commands: Vec<Command>,
    error: Option<regex::Error>,
}

impl CommandListBuilder {
    /// Add a request to send. Must be followed by `expect()`.
    pub fn send(self, payload: impl Into<Bytes>) -> CommandListBuilderWithPayload {
        CommandListBuilderWithPayload {
            builder: self,
            payload: payload.into(),
            extra_timeout: Duration::ZERO,
            debug_message: None,
        }
    }

    /// Add a fully built command.
    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Build the list, failing on the first invalid pattern.
    pub fn build(self) -> Result<CommandList, regex::Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(CommandList {
                commands: self.commands,
            }),
        }
    }
}

/// Intermediate state for the builder after `send()` is called.
#[derive(Debug)]
pub struct CommandListBuilderWithPayload {
    builder: CommandListBuilder,
    payload: Bytes,
    extra_timeout: Duration,
    debug_message: Option<String>,
}

impl CommandListBuilderWithPayload {
    /// Specify the pattern the answer must contain.
    pub fn expect(mut self, pattern: &str) -> CommandListBuilder {
        match Command::new(self.payload, pattern) {
            Ok(mut command) => {
                command.extra_timeout = self.extra_timeout;
                if let Some(message) = self.debug_message {
                    command.debug_message = message;
                }
                self.builder.commands.push(command);
            }
            Err(err) => {
                self.builder.error.get_or_insert(err);
            }
        }
        self.builder
    }

    /// Allow this answer extra time.
    pub fn with_extra_timeout(mut self, extra: Duration) -> Self {
        self.extra_timeout = extra;
        self
    }

    /// Explanation reported if this answer never matches.
    pub fn with_debug_message(mut self, message: impl Into<String>) -> Self {
        self.debug_message = Some(message.into());
        self
    }
}
