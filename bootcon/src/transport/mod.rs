//! Byte transport to the device console.
//!
//! The engine only needs a small, non-blocking view of the link: write a
//! request, ask how many bytes are waiting, and read exactly those bytes.
//! Any failure is reported as a [`TransportError`] and treated upstream as
//! a lost connection.

pub mod config;
pub mod scripted;
mod serial;

use std::future::Future;

pub use config::SerialConfig;
pub use scripted::ScriptedTransport;
pub use serial::SerialTransport;

use crate::error::TransportError;

/// Duplex byte channel to a bootloader console.
pub trait Transport: Send {
    /// Write the bytes verbatim.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Number of bytes that can be read without waiting.
    fn available(&mut self) -> impl Future<Output = Result<usize, TransportError>> + Send;

    /// Read up to `n` bytes that are already waiting.
    fn read(&mut self, n: usize) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Close the channel. Further operations fail with [`TransportError::NotOpen`].
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Read everything currently waiting (possibly nothing).
    fn read_available(&mut self) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send {
        async move {
            let n = self.available().await?;
            if n == 0 {
                return Ok(Vec::new());
            }
            self.read(n).await
        }
    }
}
