//! Output sinks for the formatted writer.
//!
//! The writer hands each sink chunks of composed bytes through
//! [`OutputSink::write_chunk`] and calls [`OutputSink::finish`] exactly once
//! at the end of a call, whether it succeeded or not.

use crate::errno;
use crate::error::{Result, StdioError};

/// Size of the [`Descriptor`] staging buffer, as `BUFSIZ`.
pub const BUFSIZ: usize = 1024;

/// Destination for formatted bytes.
pub trait OutputSink {
    /// Accept a chunk of output. A sink that drops bytes (truncation) still
    /// reports success; only transport failures are errors.
    fn write_chunk(&mut self, bytes: &[u8]) -> Result<()>;

    /// End of one formatted write: terminate or flush.
    fn finish(&mut self) -> Result<()>;
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn write_chunk(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_chunk(bytes)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Caller-provided fixed-capacity buffer (`snprintf`).
///
/// Stores at most `capacity - 1` content bytes followed by a NUL. Bytes past
/// that are dropped silently. A zero-capacity buffer is never written.
#[derive(Debug)]
pub struct FixedBuffer<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> FixedBuffer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Content bytes stored so far, without the terminator.
    #[must_use]
    pub fn stored(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Whether output beyond the capacity has been dropped.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len + 1 >= self.buf.len()
    }
}

impl OutputSink for FixedBuffer<'_> {
    fn write_chunk(&mut self, bytes: &[u8]) -> Result<()> {
        let room = self.buf.len().saturating_sub(1).saturating_sub(self.len);
        let n = room.min(bytes.len());
        self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(slot) = self.buf.get_mut(self.len) {
            *slot = 0;
        }
        Ok(())
    }
}

/// Heap buffer that grows as needed (`asprintf`).
///
/// Growth is fallible: an allocation failure becomes
/// `OutputError { errno: ENOMEM }` rather than an abort. After
/// [`finish`](OutputSink::finish) the storage holds a trailing NUL which is
/// not part of the content.
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    buf: Vec<u8>,
    len: usize,
}

impl GrowableBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut sink = Self::new();
        sink.reserve(capacity)?;
        Ok(sink)
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        self.buf.try_reserve(additional).map_err(|_| {
            log::debug!("growable sink: allocation of {additional} more bytes failed");
            StdioError::OutputError {
                errno: errno::ENOMEM,
            }
        })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Content followed by its terminator, once finished.
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.truncate(self.len);
        self.buf
    }
}

impl OutputSink for GrowableBuffer {
    fn write_chunk(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.truncate(self.len);
        self.reserve(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        self.len = self.buf.len();
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.buf.truncate(self.len);
        self.reserve(1)?;
        self.buf.push(0);
        Ok(())
    }
}

/// Byte transport behind a [`Descriptor`]: the `write(2)` contract.
///
/// Returns the number of bytes accepted (possibly fewer than offered) or an
/// errno value.
pub trait RawWrite {
    fn write(&mut self, bytes: &[u8]) -> core::result::Result<usize, i32>;
}

/// A file descriptor written with `write(2)`. The descriptor is borrowed,
/// never closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFd(pub libc::c_int);

impl RawWrite for RawFd {
    fn write(&mut self, bytes: &[u8]) -> core::result::Result<usize, i32> {
        // SAFETY: `bytes` is a live slice; the kernel reads at most its length.
        let rc = unsafe { libc::write(self.0, bytes.as_ptr().cast(), bytes.len()) };
        if rc < 0 {
            Err(std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or(errno::EIO))
        } else {
            Ok(rc as usize)
        }
    }
}

/// Adapter from any [`std::io::Write`].
#[derive(Debug)]
pub struct IoWrite<W>(pub W);

impl<W: std::io::Write> RawWrite for IoWrite<W> {
    fn write(&mut self, bytes: &[u8]) -> core::result::Result<usize, i32> {
        match self.0.write(bytes) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Err(errno::EINTR),
            Err(e) => Err(e.raw_os_error().unwrap_or(errno::EIO)),
        }
    }
}

/// Buffered descriptor sink (`dprintf`).
///
/// Bytes are staged up to [`BUFSIZ`] and flushed with full-write
/// semantics: partial writes and `EINTR` are retried, a write that accepts
/// nothing is `EIO`, and any other errno fails the call. No terminator is
/// ever written.
#[derive(Debug)]
pub struct Descriptor<T: RawWrite> {
    transport: T,
    staged: Vec<u8>,
    flushed: usize,
}

impl<T: RawWrite> Descriptor<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            staged: Vec::with_capacity(BUFSIZ),
            flushed: 0,
        }
    }

    /// Bytes delivered to the transport so far.
    #[must_use]
    pub fn flushed(&self) -> usize {
        self.flushed
    }

    #[must_use]
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Give back the transport. Staged bytes that were never flushed are lost.
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn write_all(&mut self, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            match self.transport.write(bytes) {
                Ok(0) => {
                    log::debug!("descriptor sink: transport accepted 0 of {} bytes", bytes.len());
                    return Err(StdioError::OutputError { errno: errno::EIO });
                }
                Ok(n) => {
                    let n = n.min(bytes.len());
                    if n < bytes.len() {
                        log::debug!("descriptor sink: partial write {n}/{}, retrying", bytes.len());
                    }
                    self.flushed += n;
                    bytes = &bytes[n..];
                }
                Err(errno::EINTR) => {
                    log::debug!("descriptor sink: write interrupted, retrying");
                }
                Err(code) => {
                    log::debug!("descriptor sink: write failed with errno {code}");
                    return Err(StdioError::OutputError { errno: code });
                }
            }
        }
        Ok(())
    }

    fn flush_staged(&mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        let result = self.write_all(&staged);
        self.staged = staged;
        self.staged.clear();
        result
    }
}

impl<T: RawWrite> OutputSink for Descriptor<T> {
    fn write_chunk(&mut self, bytes: &[u8]) -> Result<()> {
        if self.staged.len() + bytes.len() > BUFSIZ {
            self.flush_staged()?;
        }
        if bytes.len() >= BUFSIZ {
            return self.write_all(bytes);
        }
        self.staged.extend_from_slice(bytes);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.flush_staged()
    }
}
