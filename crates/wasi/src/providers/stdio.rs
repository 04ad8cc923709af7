//! Standard I/O endpoints.
//!
//! A [`Writable`] receives bytes the guest wrote via `fd_write`; a
//! [`Readable`] produces bytes to satisfy `fd_read`. Both are synchronous:
//! the core never suspends a host call (see the crate's concurrency notes),
//! so an embedder that needs asynchronous I/O must pre-buffer before
//! calling into the guest.

use std::io::Write as _;

/// A sink for bytes written by the guest to stdout/stderr.
pub trait Writable: Send {
    /// Consumes `bytes` (already concatenated from the guest's iovecs).
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()>;
    /// Called once when the guest closes this descriptor. Closing does not
    /// remove the slot: the proxy stays reachable afterwards (see
    /// `fd_close` in [`crate::fs`]).
    fn close(&mut self) {}
}

/// A source of bytes for the guest to read from stdin.
pub trait Readable: Send {
    /// Produces the next chunk of input, or an empty vector at end of input.
    fn consume(&mut self) -> std::io::Result<Vec<u8>>;
    fn close(&mut self) {}
}

/// A [`Writable`] that forwards to one of the process's inherited
/// `stdout`/`stderr` streams.
pub struct InheritStdout;
pub struct InheritStderr;

impl Writable for InheritStdout {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        std::io::stdout().write_all(bytes)
    }
}

impl Writable for InheritStderr {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        std::io::stderr().write_all(bytes)
    }
}

/// A [`Readable`] that forwards to the process's inherited `stdin`.
///
/// Reads the whole remaining contents of stdin on first use and hands it out
/// in one chunk; subsequent calls report end of input. This keeps the
/// readable side synchronous without blocking on a line-oriented protocol.
pub struct InheritStdin {
    exhausted: bool,
}

impl InheritStdin {
    pub fn new() -> Self {
        Self { exhausted: false }
    }
}

impl Default for InheritStdin {
    fn default() -> Self {
        Self::new()
    }
}

impl Readable for InheritStdin {
    fn consume(&mut self) -> std::io::Result<Vec<u8>> {
        use std::io::Read as _;
        if self.exhausted {
            return Ok(Vec::new());
        }
        self.exhausted = true;
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// A [`Writable`] that appends everything written to an in-memory buffer.
///
/// Useful for tests and embedders that want to capture guest output.
#[derive(Default)]
pub struct CapturingWriter {
    captured: Vec<u8>,
}

impl CapturingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.captured
    }
}

impl Writable for CapturingWriter {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.captured.extend_from_slice(bytes);
        Ok(())
    }
}

/// A [`Readable`] backed by a fixed in-memory buffer, handed out as one chunk.
pub struct FixedReader {
    remaining: Option<Vec<u8>>,
}

impl FixedReader {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            remaining: Some(bytes.into()),
        }
    }
}

impl Readable for FixedReader {
    fn consume(&mut self) -> std::io::Result<Vec<u8>> {
        Ok(self.remaining.take().unwrap_or_default())
    }
}

/// The carry-over state layered on top of a [`Readable`] to implement
/// arbitrary iovec partitioning over `consume()`'s chunk boundaries.
pub(crate) struct ReadableProxy {
    inner: Box<dyn Readable>,
    carry: Vec<u8>,
    carry_pos: usize,
}

impl ReadableProxy {
    pub(crate) fn new(inner: Box<dyn Readable>) -> Self {
        Self {
            inner,
            carry: Vec::new(),
            carry_pos: 0,
        }
    }

    /// Fills `dst` as much as possible, pulling from the carry-over buffer
    /// first and then invoking `consume()` until `dst` is full or input is
    /// exhausted. Returns the number of bytes written into `dst`.
    pub(crate) fn read(&mut self, dst: &mut [u8]) -> std::io::Result<usize> {
        let mut written = 0;
        while written < dst.len() {
            if self.carry_pos < self.carry.len() {
                let available = &self.carry[self.carry_pos..];
                let n = available.len().min(dst.len() - written);
                dst[written..written + n].copy_from_slice(&available[..n]);
                self.carry_pos += n;
                written += n;
                continue;
            }
            let chunk = self.inner.consume()?;
            if chunk.is_empty() {
                break;
            }
            self.carry = chunk;
            self.carry_pos = 0;
        }
        Ok(written)
    }

    pub(crate) fn close(&mut self) {
        self.inner.close();
    }
}

/// Bundles the three standard descriptors the memory file system exposes at
/// fd 0, 1, 2.
pub(crate) struct StdioSlots {
    pub(crate) stdin: ReadableProxy,
    pub(crate) stdout: Box<dyn Writable>,
    pub(crate) stderr: Box<dyn Writable>,
}

impl StdioSlots {
    pub(crate) fn inherit() -> Self {
        Self {
            stdin: ReadableProxy::new(Box::new(InheritStdin::new())),
            stdout: Box::new(InheritStdout),
            stderr: Box::new(InheritStderr),
        }
    }
}
