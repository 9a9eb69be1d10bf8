//! Draining stale console output before a new exchange.

use std::time::Duration;

use log::{debug, trace};
use tokio::time::Instant;

use super::buffer::SessionBuffer;
use crate::error::PollError;
use crate::transport::Transport;

/// Drains bytes already waiting on the transport so that a late answer to
/// a previous request is never taken for the answer to the next one.
#[derive(Debug, Clone, Copy)]
pub struct BufferCleaner {
    /// Pause between drain iterations.
    tick: Duration,

    /// Give up once draining has taken this long.
    max_duration: Duration,
}

impl BufferCleaner {
    /// Create a cleaner with the given tick and drain budget.
    pub fn new(tick: Duration, max_duration: Duration) -> Self {
        Self { tick, max_duration }
    }

    /// Drain the transport into `buffer`.
    ///
    /// Returns the number of bytes drained. Fails with
    /// [`PollError::BufferCleanTimeout`] if the device is still emitting
    /// once the drain budget is spent, and with
    /// [`PollError::ConnectionLost`] on any transport fault.
    pub async fn drain<T: Transport>(
        &self,
        transport: &mut T,
        buffer: &mut SessionBuffer,
    ) -> Result<usize, PollError> {
        let start = Instant::now();
        let mut drained = 0;

        loop {
            let waiting = transport.available().await?;
            if waiting == 0 {
                if drained > 0 {
                    debug!("drained {} stale bytes in {:?}", drained, start.elapsed());
                }
                return Ok(drained);
            }

            let data = transport.read(waiting).await?;
            buffer.extend(&data);
            drained += data.len();
            trace!("drain: {} bytes, {} total", data.len(), drained);

            let elapsed = start.elapsed();
            if elapsed >= self.max_duration {
                return Err(PollError::BufferCleanTimeout { elapsed });
            }

            tokio::time::sleep(self.tick).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::ScriptedTransport;

    fn cleaner() -> BufferCleaner {
        BufferCleaner::new(Duration::from_millis(100), Duration::from_secs(45))
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_channel_returns_immediately() {
        let mut transport = ScriptedTransport::new();
        let mut buffer = SessionBuffer::new();

        let start = Instant::now();
        let drained = cleaner().drain(&mut transport, &mut buffer).await.unwrap();

        assert_eq!(drained, 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_bytes_go_to_session_buffer() {
        let mut transport = ScriptedTransport::new()
            .preload("late answer\r\n")
            .preload("=> ");
        let mut buffer = SessionBuffer::new();

        let drained = cleaner().drain(&mut transport, &mut buffer).await.unwrap();

        assert_eq!(drained, 16);
        assert_eq!(buffer.as_slice(), b"late answer\r\n=> ");
        assert_eq!(transport.available().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_endless_output_times_out() {
        let mut transport = ScriptedTransport::new().stream_forever("spam");
        let mut buffer = SessionBuffer::new();

        let start = Instant::now();
        let err = cleaner()
            .drain(&mut transport, &mut buffer)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BufferCleanTimeout);
        assert!(start.elapsed() >= Duration::from_secs(45));
        assert!(start.elapsed() < Duration::from_secs(46));
        assert!(!buffer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_is_connection_lost() {
        let mut transport = ScriptedTransport::new();
        transport.disconnect();
        let mut buffer = SessionBuffer::new();

        let err = cleaner()
            .drain(&mut transport, &mut buffer)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
