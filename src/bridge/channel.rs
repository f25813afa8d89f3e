//! The stream adapter: one transport stream exposed as a generic byte
//! channel with threshold-triggered flushing.

use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::transport::{StreamRole, Transport, WriteError};

/// Errors surfaced by channel operations other than writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ChannelError {
    /// The three channels are opaque byte streams; native OS descriptors
    /// are not retrievable through them.
    #[error("channel does not expose a native OS handle")]
    HandleUnsupported,
}

/// Book-keeping for one logical stream, kept across accept cycles.
///
/// The counter tracks bytes written since the last flush; it is zeroed on
/// every flush and close.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StreamBinding {
    pending: usize,
}

impl StreamBinding {
    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

    pub(crate) fn reset(&mut self) {
        self.pending = 0;
    }
}

/// A borrow-guard over one logical stream of the active request.
///
/// Obtained from [`FcgiBridge::channel`](crate::FcgiBridge::channel) at call
/// time; it never stores a transport handle, only the stream's [`StreamRole`].
/// Dropping it is free.
pub struct Channel<'a, T: Transport> {
    role: StreamRole,
    bound: bool,
    binding: &'a mut StreamBinding,
    transport: &'a mut T,
    threshold: usize,
}

impl<'a, T: Transport> Channel<'a, T> {
    pub(crate) fn new(
        role: StreamRole,
        bound: bool,
        binding: &'a mut StreamBinding,
        transport: &'a mut T,
        threshold: usize,
    ) -> Self {
        Self {
            role,
            bound,
            binding,
            transport,
            threshold,
        }
    }

    /// The stream this channel addresses.
    #[must_use]
    pub fn role(&self) -> StreamRole {
        self.role
    }

    /// Bytes written since the last flush of this stream.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.binding.pending
    }

    /// Reads up to `buf.len()` bytes from the stream.
    ///
    /// Returns 0 when `buf` is empty or no request is bound; both are
    /// treated as end of stream, not errors. A short read is a normal
    /// streaming outcome and is not retried.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        if !self.bound || buf.is_empty() {
            return 0;
        }
        self.transport.read(self.role, buf)
    }

    /// Writes all of `buf` to the stream.
    ///
    /// Returns `Ok(0)` without error when the stream is read-only, already
    /// closed, or no request is bound. Otherwise the whole buffer is
    /// written, looping over short transport writes; a hard transport error
    /// aborts the operation as a total failure carrying the transport's
    /// error code, never a partial count.
    ///
    /// The stream's pending-byte counter accumulates `buf.len()` up front,
    /// and a successful write that leaves the counter above the configured
    /// threshold triggers an eager flush. A zero-length write still runs
    /// that check, so lowering the threshold between writes can make an
    /// empty write flush earlier accumulation.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, WriteError> {
        if !self.bound {
            return Ok(0);
        }

        let flags = self.transport.stream_flags(self.role);
        if flags.read_only || flags.closed {
            return Ok(0);
        }

        self.binding.pending += buf.len();
        let flush_after = self.binding.pending > self.threshold;

        let mut written = 0;
        while written < buf.len() {
            written += self.transport.write(self.role, &buf[written..])?;
        }

        if flush_after {
            #[cfg(feature = "tracing")]
            trace!(
                stream = %self.role,
                pending = self.binding.pending,
                threshold = self.threshold,
                "Threshold flush"
            );

            self.transport.flush(self.role);
            self.binding.reset();
        }

        Ok(buf.len())
    }

    /// Flushes the stream's transport buffer and zeroes the pending
    /// counter. The transport exposes no flush failure path, so this
    /// always succeeds.
    pub fn flush(&mut self) {
        self.transport.flush(self.role);
        self.binding.reset();
    }

    /// Closes this channel's book-keeping: the pending counter is zeroed.
    ///
    /// The underlying handle stays with the transport; actual teardown
    /// happens in [`FcgiBridge::finish`](crate::FcgiBridge::finish).
    pub fn close(&mut self) {
        self.binding.reset();
    }

    /// Native OS descriptor retrieval. Always fails: the channels are
    /// opaque beyond read/write/flush/close.
    pub fn os_handle(&self) -> Result<std::os::raw::c_int, ChannelError> {
        Err(ChannelError::HandleUnsupported)
    }
}
