//! A FastCGI request-cycle bridge for embedding in a host scripting runtime.
//!
//! This crate adapts the accept/serve/finish cycle of a FastCGI transport
//! into three generic byte-stream channels (request body, response body,
//! error channel) plus a small set of request-lifecycle operations, ready
//! for a scripting runtime to expose as interpreter commands.
//!
//! # Execution Model
//!
//! One bridge instance serves one request at a time, serially, on the
//! calling thread. [`FcgiBridge::accept`] is the only blocking point: it
//! removes the previous request's environment, flushes pending output,
//! and waits for the transport to deliver the next request. A process
//! started as plain CGI serves exactly one implicit request and then
//! reports end-of-input forever.
//!
//! # Example
//!
//! ```
//! use fcgi_bridge::prelude::*;
//!
//! fn serve<T: Transport, H: HostRuntime>(transport: T, host: H) {
//!     let mut bridge = FcgiBridge::new(transport, host);
//!     loop {
//!         match bridge.accept() {
//!             AcceptStatus::Accepted(_) => {
//!                 let mut out = bridge.channel(StreamRole::Output);
//!                 let _ = out.write(b"Content-Type: text/plain\n\nhello\n");
//!                 bridge.finish();
//!             }
//!             AcceptStatus::CgiDone | AcceptStatus::Shutdown(_) => break,
//!         }
//!     }
//! }
//! ```

pub mod commands;
pub mod host;
pub mod transport;

mod bridge;

pub use bridge::{
    AcceptStatus, Channel, ChannelError, FcgiBridge, RunMode,
    DEFAULT_FLUSH_THRESHOLD,
};

pub use host::HostRuntime;

pub use transport::{
    AcceptResult, StreamFlags, StreamRole, Transport, WriteError,
};

pub use commands::{dispatch, CommandError, COMMAND_NAMES, PACKAGE_VERSION};

pub mod prelude {
    pub use crate::{
        dispatch, AcceptResult, AcceptStatus, Channel, ChannelError,
        CommandError, FcgiBridge, HostRuntime, RunMode, StreamFlags,
        StreamRole, Transport, WriteError, COMMAND_NAMES,
        DEFAULT_FLUSH_THRESHOLD,
    };
}
