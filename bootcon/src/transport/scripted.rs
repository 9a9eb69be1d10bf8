//! Scripted in-memory transport for tests and dry runs.
//!
//! Responses are registered as rules keyed by a byte trigger: whenever a
//! written request contains the trigger, the rule's chunks are queued as
//! incoming data. Only one queued chunk becomes visible per
//! [`available`](Transport::available) call, so a multi-chunk answer
//! arrives split across poll ticks the way a slow console delivers it.

use std::collections::VecDeque;

use memchr::memmem;

use super::Transport;
use crate::error::TransportError;

/// A response rule.
#[derive(Debug, Clone)]
struct Rule {
    trigger: Vec<u8>,
    chunks: Vec<Vec<u8>>,
    /// First matching write (1-based) that gets an answer.
    from: usize,
    /// Matching writes seen so far.
    seen: usize,
}

/// When the transport should start failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    None,
    /// Fail every write after this many successful writes.
    WritesAfter(usize),
    /// Fail every read once this many writes have succeeded.
    ReadsAfterWrites(usize),
    /// Fail every operation.
    Always,
}

/// In-memory [`Transport`] that replays scripted console output.
#[derive(Debug)]
pub struct ScriptedTransport {
    rules: Vec<Rule>,
    pending: VecDeque<Vec<u8>>,
    stream: Option<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    fault: Fault,
    open: bool,
}

impl ScriptedTransport {
    /// Create a transport that never answers.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            pending: VecDeque::new(),
            stream: None,
            writes: Vec::new(),
            fault: Fault::None,
            open: true,
        }
    }

    /// Answer any request containing `trigger` with `response`.
    pub fn respond(self, trigger: impl AsRef<[u8]>, response: impl AsRef<[u8]>) -> Self {
        self.respond_chunked(trigger, [response])
    }

    /// Answer any request containing `trigger` with `chunks`, one per tick.
    pub fn respond_chunked<I, C>(mut self, trigger: impl AsRef<[u8]>, chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        self.rules.push(Rule {
            trigger: trigger.as_ref().to_vec(),
            chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            from: 1,
            seen: 0,
        });
        self
    }

    /// Ignore the first `nth - 1` requests containing `trigger`, then
    /// answer every later one with `response`.
    pub fn respond_from(
        mut self,
        trigger: impl AsRef<[u8]>,
        nth: usize,
        response: impl AsRef<[u8]>,
    ) -> Self {
        self.rules.push(Rule {
            trigger: trigger.as_ref().to_vec(),
            chunks: vec![response.as_ref().to_vec()],
            from: nth,
            seen: 0,
        });
        self
    }

    /// Queue bytes that are already waiting before the first request.
    pub fn preload(mut self, data: impl AsRef<[u8]>) -> Self {
        self.pending.push_back(data.as_ref().to_vec());
        self
    }

    /// Emit `chunk` on every poll, forever.
    pub fn stream_forever(mut self, chunk: impl AsRef<[u8]>) -> Self {
        self.stream = Some(chunk.as_ref().to_vec());
        self
    }

    /// Fail every write after `count` successful writes.
    pub fn fail_writes_after(mut self, count: usize) -> Self {
        self.fault = Fault::WritesAfter(count);
        self
    }

    /// Fail every `available`/`read` once `count` writes have succeeded.
    ///
    /// Drains before those writes still work, so the fault hits while an
    /// answer is being awaited.
    pub fn fail_reads_after_writes(mut self, count: usize) -> Self {
        self.fault = Fault::ReadsAfterWrites(count);
        self
    }

    /// Fail every operation, as if the cable was pulled.
    pub fn disconnect(&mut self) {
        self.fault = Fault::Always;
    }

    /// Every request written so far, in order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Whether any written request contained `needle`.
    pub fn was_written(&self, needle: impl AsRef<[u8]>) -> bool {
        let needle = needle.as_ref();
        self.writes
            .iter()
            .any(|w| memmem::find(w, needle).is_some())
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        !self.open
    }

    fn check(&self) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        if self.fault == Fault::Always {
            return Err(TransportError::Disconnected);
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), TransportError> {
        self.check()?;
        if let Fault::ReadsAfterWrites(count) = self.fault {
            if self.writes.len() >= count {
                return Err(TransportError::Disconnected);
            }
        }
        Ok(())
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ScriptedTransport {
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.check()?;
        if let Fault::WritesAfter(count) = self.fault {
            if self.writes.len() >= count {
                return Err(TransportError::Disconnected);
            }
        }

        self.writes.push(data.to_vec());
        if let Some(rule) = self
            .rules
            .iter_mut()
            .find(|r| memmem::find(data, &r.trigger).is_some())
        {
            rule.seen += 1;
            if rule.seen >= rule.from {
                self.pending.extend(rule.chunks.iter().cloned());
            }
        }
        Ok(())
    }

    async fn available(&mut self) -> Result<usize, TransportError> {
        self.check_read()?;
        if let Some(chunk) = &self.stream {
            return Ok(chunk.len());
        }
        Ok(self.pending.front().map_or(0, Vec::len))
    }

    async fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        self.check_read()?;
        if let Some(chunk) = &self.stream {
            return Ok(chunk[..n.min(chunk.len())].to_vec());
        }

        let Some(front) = self.pending.front_mut() else {
            return Ok(Vec::new());
        };
        if n >= front.len() {
            return Ok(self.pending.pop_front().unwrap_or_default());
        }
        let rest = front.split_off(n);
        Ok(std::mem::replace(front, rest))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }
}
