//! Byte streams backing the guest's I/O capabilities.

use std::fmt;
use std::io::Write;

/// Stateful byte source for the input capability.
///
/// Holds the run's entire input plus a position. The position starts at 0,
/// never decreases, and advances by exactly one per successful read. A cursor
/// lives for one run and is never reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputCursor {
    bytes: Vec<u8>,
    position: usize,
}

impl InputCursor {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            position: 0,
        }
    }

    /// Return the byte at the current position and advance by one, or `None`
    /// once the input is exhausted. Exhaustion is stable: every later call
    /// also returns `None` and leaves the position unchanged.
    pub fn read(&mut self) -> Option<u8> {
        let byte = self.bytes.get(self.position).copied()?;
        self.position += 1;
        Some(byte)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.bytes.len()
    }
}

/// Append-only byte sequence for the output capability.
///
/// Append order equals the guest's call order; nothing is reordered, buffered,
/// or coalesced. Each appended byte is optionally written through to a
/// presentation writer as it arrives, which is how a console surface observes
/// output character-by-character while the guest is still running.
pub struct OutputSink {
    buf: Vec<u8>,
    echo: Option<Box<dyn Write + Send>>,
}

impl OutputSink {
    /// A sink that only accumulates bytes in memory.
    pub fn buffered() -> Self {
        Self {
            buf: Vec::new(),
            echo: None,
        }
    }

    /// A sink that also streams each byte to `writer` as it is appended.
    pub fn with_echo(writer: Box<dyn Write + Send>) -> Self {
        Self {
            buf: Vec::new(),
            echo: Some(writer),
        }
    }

    /// Append one byte. The output capability always succeeds, so echo write
    /// failures are dropped rather than propagated into the guest.
    pub fn append(&mut self, byte: u8) {
        self.buf.push(byte);
        if let Some(writer) = self.echo.as_mut() {
            let _ = writer.write_all(&[byte]);
            let _ = writer.flush();
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink")
            .field("buf", &self.buf)
            .field("echo", &self.echo.is_some())
            .finish()
    }
}
