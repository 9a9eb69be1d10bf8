//! Append-only record of everything read from the console.

use std::borrow::Cow;

/// Raw console output accumulated over a whole session.
///
/// Bytes are stored exactly as received. The buffer never shrinks; it is
/// handed to the session logger when the session ends.
#[derive(Debug, Default)]
pub struct SessionBuffer {
    buffer: Vec<u8>,
}

impl SessionBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
        }
    }

    /// Append raw bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_keeps_raw_bytes() {
        let mut buffer = SessionBuffer::new();
        buffer.extend(b"\x1b[32mU-Boot\x1b[0m");
        buffer.extend(b"\r\n=> ");
        assert_eq!(buffer.as_slice(), b"\x1b[32mU-Boot\x1b[0m\r\n=> ");
        assert_eq!(buffer.len(), 20);
    }

    #[test]
    fn test_lossy_view() {
        let mut buffer = SessionBuffer::new();
        assert!(buffer.is_empty());
        buffer.extend(b"ok\xff");
        assert_eq!(buffer.as_str_lossy(), "ok\u{fffd}");
    }
}
