//! Contract for the underlying FastCGI transport library.
//!
//! The transport performs the actual socket accept, multiplexed stream
//! framing, and environment-array construction. This crate never touches a
//! socket itself: everything below [`Transport`] is a black box, and the
//! bridge addresses the three per-request streams by [`StreamRole`] so no
//! transport handle ever escapes into caller code.

use thiserror::Error;

/// Identity of one of the three logical streams of a request cycle.
///
/// The transport owns the live stream handles and resolves a role to the
/// current request's handle at call time. Between requests a role simply has
/// no handle behind it, which the transport reports as end-of-stream reads
/// and no-op flushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StreamRole {
    /// Request body (readable).
    Input,
    /// Response body (writable, buffered).
    Output,
    /// Error channel (writable, buffered independently of `Output`).
    Error,
}

impl StreamRole {
    /// All three roles, in input/output/error order.
    pub const ALL: [StreamRole; 3] = [Self::Input, Self::Output, Self::Error];

    /// Conventional channel name a host may register this role under.
    #[must_use]
    pub fn channel_name(self) -> &'static str {
        match self {
            Self::Input => "fcgi0",
            Self::Output => "fcgi1",
            Self::Error => "fcgi2",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for StreamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Error => "error",
        })
    }
}

/// Writability state of a transport stream, inspected before a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamFlags {
    /// The stream only supports reads (the request-body stream).
    pub read_only: bool,
    /// The stream has been closed by the transport.
    pub closed: bool,
}

/// Outcome of a blocking [`Transport::accept`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptResult {
    /// A new request cycle is ready.
    Accepted {
        /// Non-negative connection identifier.
        id: i32,
        /// Ordered `key=value` environment snapshot for the request.
        env: Vec<String>,
    },
    /// The transport is shutting down; carries its negative result code.
    /// The serving loop must stop once it sees this.
    Shutdown(i32),
}

/// Hard failure from the transport write path.
///
/// A short write is not an error (the adapter retries); this is the
/// distinguished sentinel case, carrying the transport's last error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("transport write failed (error code {errno})")]
pub struct WriteError {
    /// The transport's last error code for the failing stream.
    pub errno: i32,
}

/// The FastCGI transport as seen by the bridge.
///
/// Implementations wrap a FastCGI application library. All calls happen on
/// the single serving thread; nothing here needs to be `Sync`.
pub trait Transport {
    /// Whether the process was started as a plain CGI child rather than a
    /// FastCGI application. Queried exactly once, on the first accept.
    fn is_cgi(&mut self) -> bool;

    /// Blocks until the next request arrives or the transport shuts down.
    ///
    /// On success the previous request's handles are invalidated and the
    /// three roles are rebound to the new request.
    fn accept(&mut self) -> AcceptResult;

    /// Tears down the current connection, flushing any bytes the transport
    /// still buffers. Best-effort; failures are not reported.
    fn finish(&mut self);

    /// Records the application exit status for the current request.
    fn set_exit_status(&mut self, status: i32);

    /// Switches the input stream to the filter-data phase of a filter-role
    /// request and returns the transport's result code.
    fn start_filter_data(&mut self) -> i32;

    /// Current writability flags for a stream.
    fn stream_flags(&self, role: StreamRole) -> StreamFlags;

    /// Bounded read into `buf`. Returns the byte count actually read, which
    /// may be less than `buf.len()`; 0 means end of stream. Must return 0
    /// when no request is active.
    fn read(&mut self, role: StreamRole, buf: &mut [u8]) -> usize;

    /// Attempts to write `buf`, returning the number of bytes the transport
    /// accepted (possibly fewer than requested) or the hard-error sentinel.
    /// The adapter loops over short writes; implementations must make
    /// progress or fail.
    fn write(&mut self, role: StreamRole, buf: &[u8]) -> Result<usize, WriteError>;

    /// Flushes a stream's transport-level buffer. Must tolerate calls with
    /// no active request.
    fn flush(&mut self, role: StreamRole);
}
