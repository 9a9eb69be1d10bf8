//! Error types for bootcon.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for bootcon operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Serial transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A single poll attempt failed
    #[error("Poll error: {0}")]
    Poll(#[from] PollError),

    /// A command sequence was aborted
    #[error("Sequence error: {0}")]
    Sequence(#[from] crate::driver::SequenceFailure),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Session log errors
    #[error("Log error: {0}")]
    Log(#[from] LogError),
}

/// Transport layer errors (port open, read, write).
///
/// Every variant is treated by the engine as a lost connection.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to open the serial port
    #[error("Failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Serial driver error
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Peer went away
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation on a closed transport
    #[error("Transport not open")]
    NotOpen,
}

/// Failure class of a poll attempt or of a whole sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Stale input kept arriving for longer than the clean budget.
    BufferCleanTimeout,
    /// The expected pattern was not seen within the timeout.
    AnswerMatch,
    /// The transport failed.
    Connection,
}

impl ErrorKind {
    /// Numeric status code as reported to host tooling.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::BufferCleanTimeout => -1,
            ErrorKind::AnswerMatch => -2,
            ErrorKind::Connection => -3,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::BufferCleanTimeout => "buffer clean timeout",
            ErrorKind::AnswerMatch => "answer match error",
            ErrorKind::Connection => "connection error",
        };
        f.write_str(name)
    }
}

/// Outcome of a failed poll attempt.
#[derive(Error, Debug)]
pub enum PollError {
    /// Input buffer could not be drained in time
    #[error("Input buffer still receiving data after {elapsed:?}")]
    BufferCleanTimeout { elapsed: Duration },

    /// Expected pattern was not matched
    #[error("Expected answer not received within {timeout:?}")]
    AnswerMatch { timeout: Duration },

    /// Transport failed mid-attempt
    #[error("Connection lost: {0}")]
    ConnectionLost(#[source] TransportError),
}

impl PollError {
    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PollError::BufferCleanTimeout { .. } => ErrorKind::BufferCleanTimeout,
            PollError::AnswerMatch { .. } => ErrorKind::AnswerMatch,
            PollError::ConnectionLost(_) => ErrorKind::Connection,
        }
    }
}

impl From<TransportError> for PollError {
    fn from(err: TransportError) -> Self {
        PollError::ConnectionLost(err)
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Malformed TOML
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Semantically invalid value
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Session log errors.
#[derive(Error, Debug)]
pub enum LogError {
    /// Writing the artifact failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The encryptor rejected the payload
    #[error("Encryption failed: {message}")]
    Encrypt { message: String },
}

/// Result type alias using bootcon's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_error_kind() {
        let err = PollError::AnswerMatch {
            timeout: Duration::from_millis(100),
        };
        assert_eq!(err.kind(), ErrorKind::AnswerMatch);

        let err: PollError = TransportError::Disconnected.into();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorKind::BufferCleanTimeout.code(), -1);
        assert_eq!(ErrorKind::AnswerMatch.code(), -2);
        assert_eq!(ErrorKind::Connection.code(), -3);
    }
}
