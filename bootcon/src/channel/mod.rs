//! Channel layer: session buffer, response matching and input draining.
//!
//! These pieces sit directly on top of a [`Transport`](crate::transport::Transport)
//! and know nothing about commands, retries or notifications.

mod buffer;
mod cleaner;
mod patterns;

pub use buffer::SessionBuffer;
pub use cleaner::BufferCleaner;
pub use patterns::{MatchItem, MatchSet, ResponseMatcher, compile_pattern};
