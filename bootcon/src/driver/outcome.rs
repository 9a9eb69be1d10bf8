//! Success and failure codes of command sequences.

use thiserror::Error;

use crate::error::{ErrorKind, PollError};

/// Kinds of successful outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuccessKind {
    /// A single command was answered.
    Command,
    /// Every command of a step was answered.
    Step,
    /// Every step of a deployment was completed.
    Total,
    /// The console port was opened.
    Connect,
}

impl SuccessKind {
    /// Numeric status code as reported to host tooling.
    pub fn code(self) -> i32 {
        match self {
            SuccessKind::Command => 1,
            SuccessKind::Step => 2,
            SuccessKind::Total => 3,
            SuccessKind::Connect => 4,
        }
    }
}

/// A sequence stopped because one command exhausted its attempts.
#[derive(Error, Debug)]
#[error("command {index} failed after {attempts} attempt(s): {source}")]
pub struct SequenceFailure {
    /// Index of the failed command in its list.
    pub index: usize,

    /// Attempts spent on that command.
    pub attempts: usize,

    /// Error of the last attempt.
    #[source]
    pub source: PollError,
}

impl SequenceFailure {
    /// Failure class of the last attempt.
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_success_codes() {
        assert_eq!(SuccessKind::Command.code(), 1);
        assert_eq!(SuccessKind::Step.code(), 2);
        assert_eq!(SuccessKind::Total.code(), 3);
        assert_eq!(SuccessKind::Connect.code(), 4);
    }

    #[test]
    fn test_failure_display() {
        let failure = SequenceFailure {
            index: 1,
            attempts: 3,
            source: PollError::AnswerMatch {
                timeout: Duration::from_millis(100),
            },
        };
        assert_eq!(failure.kind(), ErrorKind::AnswerMatch);
        assert_eq!(
            failure.to_string(),
            "command 1 failed after 3 attempt(s): Expected answer not received within 100ms"
        );
    }
}
